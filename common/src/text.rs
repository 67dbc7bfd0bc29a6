//! テキスト正規化・トークン化
//!
//! OCRや手入力の損傷説明をカタログ照合用に整形する。
//!
//! ## 処理
//! 1. 大文字化・アクセント除去（`DAÑADA` → `DANADA`）
//! 2. `[A-Z0-9]` と空白以外を空白に置換
//! 3. 連続空白を1つにまとめて前後を除去

use regex::Regex;
use std::collections::{BTreeSet, HashSet};

lazy_static::lazy_static! {
    /// 照合に寄与しない語（冠詞・前置詞・接続詞・作業指示の定型語）
    static ref STOPWORDS: HashSet<&'static str> = [
        // 冠詞
        "EL", "LA", "LOS", "LAS", "UN", "UNA", "UNOS", "UNAS", "LO",
        // 前置詞
        "A", "AL", "ANTE", "BAJO", "CON", "CONTRA", "DE", "DEL", "DESDE", "EN",
        "ENTRE", "HACIA", "HASTA", "PARA", "POR", "SEGUN", "SIN", "SOBRE", "TRAS",
        // 接続詞
        "Y", "E", "O", "U", "NI", "QUE",
        // 作業指示の定型語
        "REVISAR", "CHECAR", "VERIFICAR", "VALIDAR", "CONFIRMAR", "POSIBLE",
        "VER", "NOTA", "OBS", "ETC",
    ]
    .into_iter()
    .collect();

    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref NON_ID_RE: Regex = Regex::new(r"[^A-Za-z0-9_\-]").unwrap();
}

/// 説明文を照合用に正規化する
///
/// 冪等: `normalize(&normalize(x)) == normalize(x)`
///
/// # Examples
/// ```
/// use damage_intake_common::text::normalize;
///
/// assert_eq!(normalize("  Facia  delantera, dañada! "), "FACIA DELANTERA DANADA");
/// ```
pub fn normalize(text: &str) -> String {
    let mut buffer = String::with_capacity(text.len());

    for upper in text.chars().flat_map(char::to_uppercase) {
        let c = fold_diacritic(upper);
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            buffer.push(c);
        } else {
            buffer.push(' ');
        }
    }

    buffer.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 正規化した説明文をトークン集合に分割する
///
/// 1文字のトークンとストップワードは含まれない。
pub fn tokenize(text: &str) -> BTreeSet<String> {
    normalize(text)
        .split(' ')
        .filter(|token| token.chars().count() > 1)
        .filter(|token| !is_stopword(token))
        .map(str::to_string)
        .collect()
}

/// 正規化済みトークンがストップワードか
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// カタログ部品名を図面ゾーンIDに変換する
///
/// `"Facia delantera"` → `"FACIA_DELANTERA"`
pub fn normalize_part_id(part: &str) -> String {
    let joined = WHITESPACE_RE.replace_all(part.trim(), "_");
    NON_ID_RE.replace_all(&joined, "").to_uppercase()
}

/// ゾーンIDを帳票向けの表示名に変換する
///
/// `"PUERTA_DELANTERA_IZQ"` → `"Puerta Delantera Izquierda"`
pub fn pretty_part_name(value: &str) -> String {
    let upper = value.trim().to_uppercase().replace('_', " ");

    upper
        .split_whitespace()
        .map(|word| match word {
            "IZQ" => "IZQUIERDA",
            "DER" => "DERECHA",
            other => other,
        })
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// 大文字ラテン文字のアクセント・チルダを除去
fn fold_diacritic(c: char) -> char {
    match c {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => 'C',
        'Ď' | 'Đ' => 'D',
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => 'G',
        'Ĥ' | 'Ħ' => 'H',
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => 'I',
        'Ĵ' => 'J',
        'Ķ' => 'K',
        'Ĺ' | 'Ļ' | 'Ľ' | 'Ŀ' | 'Ł' => 'L',
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => 'N',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => 'O',
        'Ŕ' | 'Ŗ' | 'Ř' => 'R',
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => 'S',
        'Ţ' | 'Ť' | 'Ŧ' => 'T',
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => 'U',
        'Ŵ' => 'W',
        'Ý' | 'Ÿ' | 'Ŷ' => 'Y',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        other => other,
    }
}
