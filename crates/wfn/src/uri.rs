//! URI 바인딩 -- `cpe:/part:vendor:product:...` 형식
//!
//! CPE 2.2 스타일 URI를 파싱하고 canonical 형태로 역바인딩합니다.
//!
//! - 빈 위치 슬롯은 `ANY`, `-`는 `NA`로 디코딩됩니다.
//! - 퍼센트 인코딩은 원시 바이트로 디코딩됩니다. `%01`은 비인용 `?`,
//!   `%02`는 비인용 `*` 와일드카드입니다.
//! - edition 위치가 `~`로 시작하면 확장 edition 패킹
//!   (`~legacy_edition~sw_edition~target_sw~target_hw~other`)으로
//!   해석됩니다.

use crate::attributes::{Attributes, Component};
use crate::error::CpeError;

/// URI 바인딩 접두사
pub(crate) const PREFIX: &str = "cpe:/";

/// CPE URI를 파싱합니다.
pub fn parse_uri(uri: &str) -> Result<Attributes, CpeError> {
    let rest = uri
        .strip_prefix(PREFIX)
        .ok_or_else(|| CpeError::malformed(uri, "missing cpe:/ prefix"))?;

    let slots: Vec<&str> = rest.split(':').collect();
    if slots.len() > 7 {
        return Err(CpeError::malformed(uri, "too many components"));
    }

    let mut attrs = Attributes::any();
    for (i, slot) in slots.iter().enumerate() {
        match i {
            0 => {
                attrs.part = decode_component(uri, slot)?;
                validate_part(uri, &attrs.part)?;
            }
            1 => attrs.vendor = decode_component(uri, slot)?,
            2 => attrs.product = decode_component(uri, slot)?,
            3 => attrs.version = decode_component(uri, slot)?,
            4 => attrs.update = decode_component(uri, slot)?,
            5 => decode_edition(uri, slot, &mut attrs)?,
            6 => attrs.language = decode_component(uri, slot)?,
            _ => unreachable!(),
        }
    }
    Ok(attrs)
}

/// 속성을 canonical URI 형태로 바인딩합니다.
///
/// 말미의 `ANY` 슬롯은 생략됩니다. 확장 필드(`sw_edition`, `target_sw`,
/// `target_hw`, `other`) 중 하나라도 `ANY`가 아니면 edition 슬롯이
/// 패킹됩니다.
pub fn bind_uri(attrs: &Attributes) -> String {
    let edition_slot = if attrs.sw_edition.is_any()
        && attrs.target_sw.is_any()
        && attrs.target_hw.is_any()
        && attrs.other.is_any()
    {
        bind_component(&attrs.edition)
    } else {
        format!(
            "~{}~{}~{}~{}~{}",
            bind_component(&attrs.edition),
            bind_component(&attrs.sw_edition),
            bind_component(&attrs.target_sw),
            bind_component(&attrs.target_hw),
            bind_component(&attrs.other),
        )
    };

    let mut slots = vec![
        bind_component(&attrs.part),
        bind_component(&attrs.vendor),
        bind_component(&attrs.product),
        bind_component(&attrs.version),
        bind_component(&attrs.update),
        edition_slot,
        bind_component(&attrs.language),
    ];
    while slots.last().is_some_and(|s| s.is_empty()) {
        slots.pop();
    }
    format!("{PREFIX}{}", slots.join(":"))
}

fn validate_part(uri: &str, part: &Component) -> Result<(), CpeError> {
    match part {
        Component::Any | Component::Na => Ok(()),
        Component::Value(s) if matches!(s.as_str(), "a" | "o" | "h") => Ok(()),
        Component::Value(s) => Err(CpeError::malformed(uri, format!("invalid part {s:?}"))),
    }
}

fn decode_edition(uri: &str, slot: &str, attrs: &mut Attributes) -> Result<(), CpeError> {
    if !slot.starts_with('~') {
        attrs.edition = decode_component(uri, slot)?;
        return Ok(());
    }
    let parts: Vec<&str> = slot.split('~').collect();
    if parts.len() != 6 {
        return Err(CpeError::malformed(uri, "malformed packed edition"));
    }
    attrs.edition = decode_component(uri, parts[1])?;
    attrs.sw_edition = decode_component(uri, parts[2])?;
    attrs.target_sw = decode_component(uri, parts[3])?;
    attrs.target_hw = decode_component(uri, parts[4])?;
    attrs.other = decode_component(uri, parts[5])?;
    Ok(())
}

fn decode_component(uri: &str, raw: &str) -> Result<Component, CpeError> {
    if raw.is_empty() {
        return Ok(Component::Any);
    }
    if raw == "-" {
        return Ok(Component::Na);
    }

    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = raw
                    .get(i + 1..i + 3)
                    .ok_or_else(|| CpeError::malformed(uri, "truncated percent encoding"))?;
                let code = u8::from_str_radix(hex, 16).map_err(|_| {
                    CpeError::malformed(uri, format!("invalid percent encoding %{hex}"))
                })?;
                match code {
                    0x01 => out.push('?'),
                    0x02 => out.push('*'),
                    _ => push_decoded(&mut out, code as char),
                }
                i += 3;
            }
            b'A'..=b'Z' => {
                out.push(bytes[i].to_ascii_lowercase() as char);
                i += 1;
            }
            b'a'..=b'z' | b'0'..=b'9' | b'_' => {
                out.push(bytes[i] as char);
                i += 1;
            }
            b'.' | b'-' | b'~' => {
                out.push('\\');
                out.push(bytes[i] as char);
                i += 1;
            }
            b => {
                return Err(CpeError::malformed(
                    uri,
                    format!("embedded unescaped character {:?}", b as char),
                ));
            }
        }
    }
    Ok(Component::Value(out))
}

fn push_decoded(out: &mut String, c: char) {
    match c {
        'a'..='z' | '0'..='9' | '_' => out.push(c),
        'A'..='Z' => out.push(c.to_ascii_lowercase()),
        '!'..='~' => {
            out.push('\\');
            out.push(c);
        }
        // 제어 문자 등은 원시 그대로 보존
        _ => out.push(c),
    }
}

fn bind_component(component: &Component) -> String {
    let value = match component {
        Component::Any => return String::new(),
        Component::Na => return "-".to_owned(),
        Component::Value(s) => s,
    };

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                // `.`/`-`/`~`는 URI에서 비인용으로 나타남
                Some(q @ ('.' | '-' | '~')) => out.push(q),
                Some(q) => push_percent(&mut out, q),
                None => {}
            },
            '?' => out.push_str("%01"),
            '*' => out.push_str("%02"),
            'a'..='z' | '0'..='9' | '_' => out.push(c),
            _ => push_percent(&mut out, c),
        }
    }
    out
}

fn push_percent(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    for b in c.encode_utf8(&mut buf).bytes() {
        out.push_str(&format!("%{b:02x}"));
    }
}
