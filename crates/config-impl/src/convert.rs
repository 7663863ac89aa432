//! 属性值转换
//!
//! 把解析得到的字符串转换为目标 [`ValueType`]。

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sprig_common::{PropertyError, PropertyResult, PropertyValue, ValueType};

const SECONDS_PER_DAY: u64 = 86_400;

/// 将字符串转换为指定类型的属性值
pub fn convert(key: &str, raw: &str, value_type: ValueType) -> PropertyResult<PropertyValue> {
    let failed = || PropertyError::Conversion {
        key: key.to_string(),
        value: raw.to_string(),
        target: value_type.to_string(),
    };
    let value = match value_type {
        ValueType::String => PropertyValue::String(raw.to_string()),
        // 只有忽略大小写的 "true" 为真，其余一律为假
        ValueType::Bool => PropertyValue::Bool(raw.eq_ignore_ascii_case("true")),
        ValueType::I8 => PropertyValue::I8(raw.parse().map_err(|_| failed())?),
        ValueType::I16 => PropertyValue::I16(raw.parse().map_err(|_| failed())?),
        ValueType::I32 => PropertyValue::I32(raw.parse().map_err(|_| failed())?),
        ValueType::I64 => PropertyValue::I64(raw.parse().map_err(|_| failed())?),
        ValueType::U8 => PropertyValue::U8(raw.parse().map_err(|_| failed())?),
        ValueType::U16 => PropertyValue::U16(raw.parse().map_err(|_| failed())?),
        ValueType::U32 => PropertyValue::U32(raw.parse().map_err(|_| failed())?),
        ValueType::U64 => PropertyValue::U64(raw.parse().map_err(|_| failed())?),
        ValueType::Usize => PropertyValue::Usize(raw.parse().map_err(|_| failed())?),
        ValueType::F32 => PropertyValue::F32(raw.parse().map_err(|_| failed())?),
        ValueType::F64 => PropertyValue::F64(raw.parse().map_err(|_| failed())?),
        ValueType::Date => PropertyValue::Date(raw.parse::<NaiveDate>().map_err(|_| failed())?),
        ValueType::Time => PropertyValue::Time(parse_time(raw).ok_or_else(failed)?),
        ValueType::DateTime => PropertyValue::DateTime(parse_date_time(raw).ok_or_else(failed)?),
        ValueType::Duration => PropertyValue::Duration(parse_duration(raw).ok_or_else(failed)?),
    };
    Ok(value)
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
}

/// 解析 ISO-8601 时长，支持 `PnDTnHnMn.nS` 形式
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let upper = raw.trim().to_ascii_uppercase();
    let rest = upper.strip_prefix('P')?;
    let (days, time) = match rest.split_once('T') {
        Some((days, time)) => (days, Some(time)),
        None => (rest, None),
    };
    if days.is_empty() && time.map_or(true, str::is_empty) {
        return None;
    }

    let mut seconds = 0_u64;
    let mut nanos = 0_u32;
    if !days.is_empty() {
        let count: u64 = days.strip_suffix('D')?.parse().ok()?;
        seconds = count.checked_mul(SECONDS_PER_DAY)?;
    }

    if let Some(time) = time {
        if time.is_empty() {
            return None;
        }
        let mut number = String::new();
        for ch in time.chars() {
            match ch {
                '0'..='9' | '.' => number.push(ch),
                'H' | 'M' => {
                    let unit = if ch == 'H' { 3_600 } else { 60 };
                    let count: u64 = number.parse().ok()?;
                    seconds = seconds.checked_add(count.checked_mul(unit)?)?;
                    number.clear();
                }
                'S' => {
                    let (whole, fraction) = number.split_once('.').unwrap_or((number.as_str(), ""));
                    let whole: u64 = whole.parse().ok()?;
                    seconds = seconds.checked_add(whole)?;
                    if !fraction.is_empty() {
                        if fraction.len() > 9 {
                            return None;
                        }
                        let padded = format!("{fraction:0<9}");
                        nanos = padded.parse().ok()?;
                    }
                    number.clear();
                }
                _ => return None,
            }
        }
        if !number.is_empty() {
            return None;
        }
    }
    Some(Duration::new(seconds, nanos))
}
