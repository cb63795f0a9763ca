//! Common regex patterns for Japanese invoice extraction.
//!
//! Patterns run over normalized OCR text (see [`super::normalize`]). `\d`
//! is Unicode-aware, so full-width digits match too; validators fold them to
//! ASCII before parsing.

use lazy_static::lazy_static;
use regex::Regex;

/// Capture group for a money amount, optionally yen-prefixed.
macro_rules! amount {
    () => {
        r"([¥￥\\]?\s*-?\d[\d,，]*)"
    };
}

lazy_static! {
    // Invoice number (請求書番号)
    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"(?:請求書番号|請求書No|請求書NO|請求番号|請求No|伝票番号|(?i:invoice\s*no))\.?\s*[:：.]?\s*([A-Za-z0-9Ａ-Ｚａ-ｚ０-９][A-Za-z0-9Ａ-Ｚａ-ｚ０-９\-_/－]*)"
    ).unwrap();

    pub static ref INVOICE_NUMBER_NO: Regex = Regex::new(
        r"(?m)(?:^|\s)(?:No|NO|№)\.?\s*[:：]?\s*([A-Za-z0-9][A-Za-z0-9\-_/]*)"
    ).unwrap();

    pub static ref INVOICE_NUMBER_STANDALONE: Regex = Regex::new(
        r"(?:^|[^A-Za-z0-9])((?:INV|IV|SEI)[-_]?\d{4,}(?:[-_/]\d+)*)"
    ).unwrap();

    // Other header fields
    pub static ref SUBJECT: Regex = Regex::new(
        r"件名\s*[:：]?\s*(.+)"
    ).unwrap();

    pub static ref ORDER_NUMBER: Regex = Regex::new(
        r"(?:注文書番号|注文番号|発注番号|注文No|発注No|(?i:po\s*no))\.?\s*[:：]?\s*([A-Za-z0-9][A-Za-z0-9\-_/]*)"
    ).unwrap();

    pub static ref CURRENCY: Regex = Regex::new(
        r"通貨\s*[:：]?\s*([A-Z]{3})"
    ).unwrap();

    pub static ref BILLING_PERIOD: Regex = Regex::new(
        r"(?:対象期間|請求期間|ご利用期間|利用期間|作業期間)\s*[:：]?\s*(.+)"
    ).unwrap();

    pub static ref PROJECT_NAME: Regex = Regex::new(
        r"(?:案件名|プロジェクト名|プロジェクト)\s*[:：]?\s*(.+)"
    ).unwrap();

    // Dates
    pub static ref DATE_TOKEN: Regex = Regex::new(
        r"(?:令和|平成|昭和|大正)\s*(?:\d{1,2}|元)\s*年\s*\d{1,2}\s*月\s*\d{1,2}\s*日|\d{4}\s*年\s*\d{1,2}\s*月\s*\d{1,2}\s*日|\d{4}\s*[/\-.]\s*\d{1,2}\s*[/\-.]\s*\d{1,2}"
    ).unwrap();

    pub static ref ISSUE_DATE: Regex = Regex::new(
        r"(?:請求書発行日|発行年月日|発行日|請求年月日|請求日|作成日|日付)\s*[:：]?\s*(.+)"
    ).unwrap();

    pub static ref TRANSACTION_DATE: Regex = Regex::new(
        r"(?:取引年月日|取引日|納品日|納入日|売上日)\s*[:：]?\s*(.+)"
    ).unwrap();

    pub static ref DUE_DATE: Regex = Regex::new(
        r"(?:お支払い?期限|支払い?期限|お支払い?期日|支払期日|お振込み?期限|振込期限|お支払日|支払日)\s*[:：]?\s*(.+)"
    ).unwrap();

    // Amounts
    pub static ref TOTAL_LABELED: Regex = Regex::new(concat!(
        r"(?:ご請求金額|御請求金額|ご請求額|御請求額|請求金額|請求額|お支払い?金額|税込合計金額|税込合計|総合計|総額)",
        r"\s*[(（]?\s*(?:税込)?\s*[)）]?\s*[:：]?\s*",
        amount!()
    )).unwrap();

    // 税抜合計, 小計 and 消費税合計 are not document totals.
    pub static ref TOTAL_PLAIN: Regex = Regex::new(concat!(
        r"(?m)(?:^|[^抜小税き])合計(?:金額)?\s*[(（]?\s*(?:税込)?\s*[)）]?\s*[:：]?\s*",
        amount!()
    )).unwrap();

    pub static ref YEN_AMOUNT: Regex = Regex::new(
        r"[¥￥\\]\s*(\d[\d,，]*)"
    ).unwrap();

    pub static ref SUBTOTAL: Regex = Regex::new(concat!(
        r"(?:小計|税抜合計|税抜金額|税抜き?価格|合計(?:金額)?\s*[(（]\s*税抜き?\s*[)）])",
        r"\s*[(（]?\s*(?:税抜き?)?\s*[)）]?\s*[:：]?\s*",
        amount!()
    )).unwrap();

    pub static ref TAX: Regex = Regex::new(concat!(
        r"(?:内消費税|うち消費税|消費税額|消費税等|消費税|税額)",
        r"\s*(?:[(（]?\s*\d{1,2}\s*[%％]\s*(?:対象)?\s*[)）]?)?\s*[:：]?\s*",
        amount!()
    )).unwrap();

    pub static ref TAX_BREAKDOWN: Regex = Regex::new(concat!(
        r"(\d{1,2})\s*[%％]\s*対象(?:金額|額)?\s*[:：]?\s*",
        amount!(),
        r"\s*円?\s*(?:[(（]?\s*(?:内?消費税|税)(?:額)?\s*[:：]?\s*",
        amount!(),
        r")?"
    )).unwrap();

    pub static ref TAX_RATE_TARGET: Regex = Regex::new(
        r"(\d{1,2})\s*[%％]\s*対象"
    ).unwrap();

    pub static ref TAX_RATE_LABELED: Regex = Regex::new(
        r"(?:消費税率?|税率)\s*[(（]?\s*[:：]?\s*(\d{1,2})\s*[%％]"
    ).unwrap();

    pub static ref TAX_EXEMPT: Regex = Regex::new(
        r"非課税|免税|不課税"
    ).unwrap();

    // Qualified-invoice registration number (登録番号)
    pub static ref REGISTRATION_NUMBER: Regex = Regex::new(
        r"(?:適格請求書発行事業者登録番号|インボイス登録番号|事業者登録番号|登録番号|登録No\.?|(?i:registration\s*no\.?))\s*[:：]?\s*([TＴイ1lI『｢「]\s*(?:\d\s*){12}\d)(?:\D|$)"
    ).unwrap();

    pub static ref REGISTRATION_NUMBER_STANDALONE: Regex = Regex::new(
        r"([TＴ]\s*(?:\d\s*){12}\d)(?:\D|$)"
    ).unwrap();

    // Contact information
    pub static ref PHONE_LABELED: Regex = Regex::new(
        r"(?:TEL|Tel|tel|ＴＥＬ|電話番号|電話|☎|℡)\s*[.:：]?\s*(\(?\+?\d[\d\-－ー‐()（）\s]{8,18}\d)"
    ).unwrap();

    pub static ref PHONE_STANDALONE: Regex = Regex::new(
        r"(\+?\d{1,5}\s*[\-－ー‐(（]\s*\d{1,4}\s*[\-－ー‐)）]\s*\d{3,4})"
    ).unwrap();

    pub static ref EMAIL_LABELED: Regex = Regex::new(
        r"(?:E-?mail|e-?mail|EMAIL|メールアドレス|メール|Mail|mail)\s*[:：]?\s*([A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+)"
    ).unwrap();

    pub static ref EMAIL: Regex = Regex::new(
        r"([A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)+)"
    ).unwrap();

    // Parties
    pub static ref HONORIFIC_NAME: Regex = Regex::new(
        r"(?m)^\s*([^\s:：][^\n]{0,40}?)\s*(?:様|御中|殿)\s*$"
    ).unwrap();

    pub static ref ISSUER_LABELED: Regex = Regex::new(
        r"(?:発行者|発行元|請求元|差出人|請求者)\s*[:：]?\s*(.+)"
    ).unwrap();

    pub static ref DEPARTMENT: Regex = Regex::new(
        r"(?m)(?:^|\s)([^\s:：]{1,20}?(?:事業部|本部|部|課|室|グループ|センター|チーム))(?:\s|$|御中|様)"
    ).unwrap();

    pub static ref CONTACT_LABELED: Regex = Regex::new(
        r"(?m)(?:ご担当者?|担当者?)\s*様?\s*[:：]\s*(\S[^\n]*?)\s*(?:様|殿)?\s*$"
    ).unwrap();

    pub static ref CONTACT_HONORIFIC: Regex = Regex::new(
        r"(?m)(?:^|\s)(\S{1,10}(?:[ 　]\S{1,10})?)\s*様\s*$"
    ).unwrap();

    pub static ref ADDRESS_LABELED: Regex = Regex::new(
        r"(?:住所|所在地)\s*[:：]?\s*(.+)"
    ).unwrap();

    pub static ref POSTAL_CODE: Regex = Regex::new(
        r"〒\s*(\d{3})\s*[\-－ー‐]\s*(\d{4})"
    ).unwrap();

    pub static ref PREFECTURE_ADDRESS: Regex = Regex::new(
        r"((?:東京都|北海道|京都府|大阪府|\p{Han}{2,3}県)[^\s,、]{1,}?[市区町村郡][^\n]*)"
    ).unwrap();

    // Bank details
    pub static ref BANK_LABELED: Regex = Regex::new(
        r"(?:銀行名|金融機関名?|お?振込先|お?振込口座)\s*[:：]?\s*([^\s:：]{1,20}?(?:銀行|信用金庫|信用組合|労働金庫|農業協同組合))"
    ).unwrap();

    pub static ref BANK_STANDALONE: Regex = Regex::new(
        r"([\p{Han}\p{Katakana}\p{Hiragana}ーA-Za-zＡ-Ｚａ-ｚ]{1,15}(?:銀行|信用金庫|信用組合|労働金庫))"
    ).unwrap();

    pub static ref BRANCH_LABELED: Regex = Regex::new(
        r"(?:支店名\s*[:：]?|支店\s*[:：])\s*([^\s:：]{1,20})"
    ).unwrap();

    pub static ref BRANCH_STANDALONE: Regex = Regex::new(
        r"([\p{Han}\p{Katakana}\p{Hiragana}ーA-Za-z0-9]{1,30}?(?:支店|出張所|営業部|支所))"
    ).unwrap();

    pub static ref ACCOUNT_TYPE_LABELED: Regex = Regex::new(
        r"(?:口座種別|預金種目|預金種別|種別|種目)\s*[:：]?\s*(普通|当座|貯蓄)"
    ).unwrap();

    pub static ref ACCOUNT_TYPE_STANDALONE: Regex = Regex::new(
        r"(普通|当座|貯蓄|[(（]普[)）]|[(（]当[)）])"
    ).unwrap();

    pub static ref ACCOUNT_NUMBER_LABELED: Regex = Regex::new(
        r"(?:口座番号|口座No|口座NO)\.?\s*[:：]?\s*(\d{6,8})(?:\D|$)"
    ).unwrap();

    pub static ref ACCOUNT_NUMBER_AFTER_TYPE: Regex = Regex::new(
        r"(?:普通|当座|貯蓄|[(（]普[)）]|[(（]当[)）])(?:預金)?\s*[:：]?\s*(?:口座)?\s*(?:No\.?|番号)?\s*[:：]?\s*(\d{6,8})(?:\D|$)"
    ).unwrap();

    pub static ref ACCOUNT_HOLDER_LABELED: Regex = Regex::new(
        r"(?:口座名義人|口座名義|名義人|名義|受取人名|受取人)\s*[:：]?\s*(.+)"
    ).unwrap();

    pub static ref ACCOUNT_HOLDER_KANA: Regex = Regex::new(
        r"(?m)^\s*((?:カ|ｶ|ユ|ﾕ|ド|ﾄﾞ)\s*[)）]\s*[ァ-ヶーｦ-ﾟ 　]{2,40}?)\s*$"
    ).unwrap();

    // Payment terms
    pub static ref PAYMENT_CONDITION_LABELED: Regex = Regex::new(
        r"(?:お支払い?条件|支払い?条件|お支払い?方法|支払い?方法|決済条件)\s*[:：]?\s*(.+)"
    ).unwrap();

    pub static ref PAYMENT_CONDITION_STANDALONE: Regex = Regex::new(
        r"((?:当月|月末|\d{1,2}日)締め?\s*(?:翌月|翌々月|当月)(?:末日?|\d{1,2}日)\s*(?:お?支払い?|払い?))"
    ).unwrap();

    pub static ref FEE_BEARER: Regex = Regex::new(
        r"振込手数料[^\n]{0,20}?(貴社|御社|お客様|ご依頼人|ご依頼主|ご負担|当社|弊社)"
    ).unwrap();
}
