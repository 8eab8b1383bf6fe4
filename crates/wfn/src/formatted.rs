//! 포맷 문자열 바인딩 -- `cpe:2.3:part:vendor:...` 형식
//!
//! CPE 2.3 포맷 문자열을 파싱하고 canonical 형태로 역바인딩합니다.
//! 11개 필드가 모두 위치 고정이며, `*`는 `ANY`, `-`는 `NA`입니다.
//! 필드 안에서 `.`/`-`/`~`는 비인용으로 나타나고 그 외 구두점은
//! 백슬래시 이스케이프가 보존됩니다.

use crate::attributes::{Attributes, Component};
use crate::error::CpeError;

/// 포맷 문자열 바인딩 접두사
pub(crate) const PREFIX: &str = "cpe:2.3:";

/// 포맷 문자열 필드 수
const FIELD_COUNT: usize = 11;

/// CPE 2.3 포맷 문자열을 파싱합니다.
pub fn parse_formatted(s: &str) -> Result<Attributes, CpeError> {
    let rest = s
        .strip_prefix(PREFIX)
        .ok_or_else(|| CpeError::malformed(s, "missing cpe:2.3: prefix"))?;

    let fields = split_unescaped(rest, ':');
    if fields.len() != FIELD_COUNT {
        return Err(CpeError::malformed(
            s,
            format!("expected {FIELD_COUNT} fields, got {}", fields.len()),
        ));
    }

    let mut attrs = Attributes::any();
    let slots: [&mut Component; FIELD_COUNT] = [
        &mut attrs.part,
        &mut attrs.vendor,
        &mut attrs.product,
        &mut attrs.version,
        &mut attrs.update,
        &mut attrs.edition,
        &mut attrs.sw_edition,
        &mut attrs.target_sw,
        &mut attrs.target_hw,
        &mut attrs.other,
        &mut attrs.language,
    ];
    for (slot, field) in slots.into_iter().zip(&fields) {
        *slot = decode_field(s, field)?;
    }

    match &attrs.part {
        Component::Any | Component::Na => {}
        Component::Value(p) if matches!(p.as_str(), "a" | "o" | "h") => {}
        Component::Value(p) => {
            return Err(CpeError::malformed(s, format!("invalid part {p:?}")));
        }
    }
    Ok(attrs)
}

/// 속성을 canonical 포맷 문자열로 바인딩합니다.
pub fn bind_formatted(attrs: &Attributes) -> String {
    let fields = [
        &attrs.part,
        &attrs.vendor,
        &attrs.product,
        &attrs.version,
        &attrs.update,
        &attrs.edition,
        &attrs.sw_edition,
        &attrs.target_sw,
        &attrs.target_hw,
        &attrs.other,
        &attrs.language,
    ];
    let bound: Vec<String> = fields.iter().map(|c| bind_field(c)).collect();
    format!("{PREFIX}{}", bound.join(":"))
}

/// 백슬래시 이스케이프를 존중하며 구분자로 분할합니다.
fn split_unescaped(s: &str, sep: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push('\\');
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if c == sep {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields
}

fn decode_field(input: &str, field: &str) -> Result<Component, CpeError> {
    match field {
        "*" => return Ok(Component::Any),
        "-" => return Ok(Component::Na),
        "" => {
            return Err(CpeError::malformed(input, "empty field"));
        }
        _ => {}
    }

    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                match chars.next() {
                    Some(q) => out.push(q.to_ascii_lowercase()),
                    None => return Err(CpeError::malformed(input, "dangling escape")),
                }
            }
            'a'..='z' | '0'..='9' | '_' => out.push(c),
            'A'..='Z' => out.push(c.to_ascii_lowercase()),
            '*' | '?' => out.push(c),
            // 포맷 문자열에서 비인용으로 나타나는 문자들
            '.' | '-' | '~' => {
                out.push('\\');
                out.push(c);
            }
            _ => {
                return Err(CpeError::malformed(
                    input,
                    format!("embedded unescaped character {c:?}"),
                ));
            }
        }
    }
    Ok(Component::Value(out))
}

fn bind_field(component: &Component) -> String {
    let value = match component {
        Component::Any => return "*".to_owned(),
        Component::Na => return "-".to_owned(),
        Component::Value(s) => s,
    };

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(q @ ('.' | '-' | '~')) => out.push(q),
                Some(q) => {
                    out.push('\\');
                    out.push(q);
                }
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
