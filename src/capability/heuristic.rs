//! Offline structuring of logistics text.
//!
//! Pattern-based: pulls references, status, dates, times, money, lane,
//! weights, dimensions, handling units, carrier, addresses and the requested
//! action out of free text. Fields the text implies but does not give
//! (an ETA that is "needed", a quote without a price) come back as `null`.

use std::str::FromStr;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};

use super::TextExtractor;
use crate::error::ExtractionError;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in extraction pattern")
}

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(purchase order|po|order|tracking(?:\s+(?:number|no\.?|#))?|shipment|bill of lading|b/l|bol|load|pro|invoice|inv|container|cntr|trailer|booking|seal|reference|ref)\b(?:\s*(?:number|no\.?|num|#|:|-)\s*)*\s*([A-Za-z0-9][A-Za-z0-9-]*\d[A-Za-z0-9-]*)")
});

/// Candidate identifiers without a label.
static BARE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\b"));

static ORDINAL: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)^\d+(st|nd|rd|th)$"));

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| re(r"\b(\d{4})-(\d{2})-(\d{2})\b"));

static US_DATE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2}|\d{4}))?\b"));

static NAMED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b(?:,?\s+(\d{4})\b)?")
});

static RELATIVE_DATE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(today|tonight|tomorrow|yesterday|end of day|eod)\b"));

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s?(am|pm)?\s?(?:-|to)\s?(\d{1,2})(?::(\d{2}))?\s?(am|pm)\b")
});

static TIME_12H: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s?(am|pm)\b"));

static TIME_24H: LazyLock<Regex> = LazyLock::new(|| re(r"\b([01]?\d|2[0-3]):([0-5]\d)\b"));

static MONEY: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)(\$|€|£|\busd|\beur|\bgbp)\s?(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)")
});

static LANE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\b(?:[Ff]rom|[Ff]or)\s+([A-Z][A-Za-z]+(?:\s[A-Z][A-Za-z]+)*)\s+(?:to|->)\s+([A-Z][A-Za-z]+(?:\s[A-Z][A-Za-z]+)*)")
});

static WEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s?(lbs?|pounds|kgs?|kilograms)\b")
});

static DIMENSIONS: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"(?i)\b(\d+(?:\.\d+)?)\s?x\s?(\d+(?:\.\d+)?)(?:\s?x\s?(\d+(?:\.\d+)?))?(?:\s?(inches|inch|in|cm|mm|ft|feet)\b|\s?(")|\b)"#)
});

static HANDLING_UNITS: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(\d+)\s?(pallets?|skids?|cartons?|pieces|pcs|boxes|cases|crates|totes)\b")
});

static CARRIER_LABEL: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bcarrier\s*:\s*([A-Za-z0-9&.' ]+?)\s*(?:[,;\n]|\.\s|\.$|$)"));

static CARRIER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(ups|fedex|usps|dhl|xpo|estes|old dominion|saia|yrc|r\+l)\b")
});

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\b(\d{1,6}\s+[A-Za-z0-9 .]+?\s(?:St|Street|Ave|Avenue|Rd|Road|Blvd|Boulevard|Dr|Drive|Ln|Lane|Way|Pkwy|Parkway|Hwy|Highway|Ct|Court)\.?),\s*([A-Za-z .]+?),\s*([A-Z]{2})\s+(\d{5}(?:-\d{4})?)\b")
});

static REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:please|pls|kindly|can you|could you|need you to)\b[\s,]*([^.?!\n]{3,120})")
});

static ETA_NEEDED: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:new |updated |revised )?eta\b[^.?!\n]{0,20}?\b(?:needed|required|requested)\b")
});

static ETA_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\beta\b\s*(?::|is|of|now|=)?\s*([^;)\n]{0,40})"));

static QUOTE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(rate|quote|quoted|pricing)\b"));

static APPOINTMENT_MENTION: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bappointment\b"));

static URGENT: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(urgent|asap|immediately|time[- ]sensitive|critical)\b"));

static STATUSES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("delayed", re(r"(?i)\b(delay(ed|s)?|running late|behind schedule)\b")),
        ("on_hold", re(r"(?i)\b(on hold|held (at|in|by)|customs hold)\b")),
        ("damaged", re(r"(?i)\bdamaged?\b")),
        ("cancelled", re(r"(?i)\bcancell?ed\b")),
        ("rescheduled", re(r"(?i)\b(rescheduled|changed to|moved to|postponed|pushed to)\b")),
        ("out_for_delivery", re(r"(?i)\bout for delivery\b")),
        ("delivered", re(r"(?i)\bdelivered\b")),
        ("in_transit", re(r"(?i)\bin transit\b")),
        ("picked_up", re(r"(?i)\bpicked up\b")),
        ("scheduled", re(r"(?i)\bscheduled\b")),
        ("shipped", re(r"(?i)\bshipped\b")),
    ]
});

const NOT_PLACES: [&str; 19] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday", "January",
    "February", "March", "April", "May", "June", "July", "August", "September", "October",
    "November", "December",
];

/// Regex-based text extractor. Never fails.
#[derive(Debug, Clone, Default)]
pub struct HeuristicTextExtractor;

impl HeuristicTextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Structure one block of text.
    pub fn extract(&self, text: &str) -> Map<String, Value> {
        let mut out = Map::new();

        insert_nonempty(&mut out, "references", references(text));
        if let Some(status) = status(text) {
            out.insert("status".into(), json!(status));
        }
        if URGENT.is_match(text) {
            out.insert("urgent".into(), Value::Bool(true));
        }
        insert_nonempty(&mut out, "dates", Value::Array(dates(text)));

        let times = times(text);
        insert_nonempty(&mut out, "times", Value::Array(times.clone()));

        let amounts = amounts(text);
        insert_nonempty(&mut out, "amounts", Value::Array(amounts.clone()));

        if let Some(lane) = lane(text) {
            out.insert("lane".into(), lane);
        }
        insert_nonempty(&mut out, "weights", Value::Array(weights(text)));
        insert_nonempty(&mut out, "dimensions", Value::Array(dimensions(text)));
        insert_nonempty(&mut out, "handling_units", Value::Array(handling_units(text)));
        if let Some(carrier) = carrier(text) {
            out.insert("carrier".into(), json!(carrier));
        }
        insert_nonempty(&mut out, "addresses", Value::Array(addresses(text)));
        if let Some(action) = requested_action(text) {
            out.insert("requested_action".into(), json!(action));
        }

        if let Some(eta) = eta(text) {
            out.insert("eta".into(), eta);
        }
        if QUOTE_MENTION.is_match(text) {
            out.insert(
                "rate".into(),
                amounts.first().cloned().unwrap_or(Value::Null),
            );
        }
        if APPOINTMENT_MENTION.is_match(text) {
            out.insert(
                "appointment".into(),
                times.first().cloned().unwrap_or(Value::Null),
            );
        }

        out
    }
}

#[async_trait]
impl TextExtractor for HeuristicTextExtractor {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn extract_from_text(&self, raw_text: &str) -> Result<Value, ExtractionError> {
        Ok(Value::Object(self.extract(raw_text)))
    }
}

fn insert_nonempty(out: &mut Map<String, Value>, key: &str, value: Value) {
    let empty = match &value {
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Null => true,
        _ => false,
    };
    if !empty {
        out.insert(key.to_string(), value);
    }
}

fn push_unique(list: &mut Vec<Value>, value: Value) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn number(raw: &str) -> Value {
    let cleaned = raw.replace(',', "");
    match Decimal::from_str(&cleaned) {
        Ok(d) => decimal_value(d),
        Err(_) => Value::String(raw.to_string()),
    }
}

fn decimal_value(d: Decimal) -> Value {
    d.normalize()
        .to_string()
        .parse::<serde_json::Number>()
        .map(Value::Number)
        .unwrap_or_else(|_| Value::String(d.to_string()))
}

// ── References ──────────────────────────────────────────────────────

fn reference_kind(label: &str) -> &'static str {
    let label = label.to_lowercase();
    match label.as_str() {
        "po" | "purchase order" => "po",
        "order" => "order",
        "shipment" => "shipment",
        "bol" | "b/l" | "bill of lading" => "bol",
        "load" => "load",
        "pro" => "pro",
        "invoice" | "inv" => "invoice",
        "container" | "cntr" => "container",
        "trailer" => "trailer",
        "booking" => "booking",
        "seal" => "seal",
        "reference" | "ref" => "reference",
        l if l.starts_with("tracking") => "tracking",
        _ => "reference",
    }
}

fn references(text: &str) -> Value {
    let mut refs: Map<String, Value> = Map::new();
    let mut seen: Vec<String> = Vec::new();
    for caps in REFERENCE.captures_iter(text) {
        let kind = reference_kind(&caps[1]);
        let value = caps[2].trim_end_matches('-');
        seen.push(value.to_string());
        let entry = refs
            .entry(kind.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = entry {
            push_unique(list, json!(value));
        }
    }

    let other: Vec<Value> = unlabelled_identifiers(text)
        .into_iter()
        .filter(|id| !seen.contains(id))
        .fold(Vec::new(), |mut list, id| {
            push_unique(&mut list, json!(id));
            list
        });
    if !other.is_empty() {
        refs.insert("other".into(), Value::Array(other));
    }
    Value::Object(refs)
}

/// Tokens that look like identifiers (letters mixed with digits, or at
/// least three digits) and are not part of a labelled reference, date,
/// time, amount, measurement or address.
fn unlabelled_identifiers(text: &str) -> Vec<String> {
    let patterns: [&Regex; 12] = [
        &*REFERENCE,
        &*ISO_DATE,
        &*US_DATE,
        &*NAMED_DATE,
        &*TIME_RANGE,
        &*TIME_12H,
        &*TIME_24H,
        &*MONEY,
        &*WEIGHT,
        &*DIMENSIONS,
        &*HANDLING_UNITS,
        &*ADDRESS,
    ];
    let taken: Vec<(usize, usize)> = patterns
        .iter()
        .flat_map(|p| p.find_iter(text).map(|m| (m.start(), m.end())))
        .collect();

    BARE_TOKEN
        .find_iter(text)
        .filter(|m| {
            !taken
                .iter()
                .any(|&(start, end)| m.start() < end && start < m.end())
        })
        .map(|m| m.as_str())
        .filter(|token| looks_like_identifier(token))
        .map(str::to_string)
        .collect()
}

fn looks_like_identifier(token: &str) -> bool {
    let digits = token.chars().filter(char::is_ascii_digit).count();
    let letters = token.chars().any(|c| c.is_ascii_alphabetic());
    if digits == 0 || ORDINAL.is_match(token) {
        return false;
    }
    letters || digits >= 3
}

fn status(text: &str) -> Option<&'static str> {
    STATUSES
        .iter()
        .find(|(_, regex)| regex.is_match(text))
        .map(|(name, _)| *name)
}

// ── Dates and times ─────────────────────────────────────────────────

fn month_number(name: &str) -> Option<u32> {
    let idx = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ]
    .iter()
    .position(|m| name.to_lowercase().starts_with(m))?;
    Some(idx as u32 + 1)
}

fn iso(date: NaiveDate) -> Value {
    json!(date.format("%Y-%m-%d").to_string())
}

/// (position, value) for each date mention.
fn date_mentions(text: &str) -> Vec<(usize, Value)> {
    let mut found = Vec::new();

    for caps in ISO_DATE.captures_iter(text) {
        let whole = caps.get(0).map_or((0, ""), |m| (m.start(), m.as_str()));
        let parsed = NaiveDate::from_ymd_opt(
            caps[1].parse().unwrap_or(0),
            caps[2].parse().unwrap_or(0),
            caps[3].parse().unwrap_or(0),
        );
        found.push((whole.0, parsed.map(iso).unwrap_or_else(|| json!(whole.1))));
    }

    for caps in US_DATE.captures_iter(text) {
        let whole = caps.get(0).map_or((0, ""), |m| (m.start(), m.as_str()));
        let parsed = caps.get(3).and_then(|y| {
            let year: i32 = y.as_str().parse().ok()?;
            let year = if year < 100 { 2000 + year } else { year };
            NaiveDate::from_ymd_opt(year, caps[1].parse().ok()?, caps[2].parse().ok()?)
        });
        found.push((whole.0, parsed.map(iso).unwrap_or_else(|| json!(whole.1))));
    }

    for caps in NAMED_DATE.captures_iter(text) {
        let whole = caps.get(0).map_or((0, ""), |m| (m.start(), m.as_str()));
        let parsed = caps.get(3).and_then(|y| {
            NaiveDate::from_ymd_opt(
                y.as_str().parse().ok()?,
                month_number(&caps[1])?,
                caps[2].parse().ok()?,
            )
        });
        found.push((whole.0, parsed.map(iso).unwrap_or_else(|| json!(whole.1.trim()))));
    }

    for m in RELATIVE_DATE.find_iter(text) {
        found.push((m.start(), json!(m.as_str().to_lowercase())));
    }

    found.sort_by_key(|(pos, _)| *pos);
    found
}

fn dates(text: &str) -> Vec<Value> {
    let mut out = Vec::new();
    for (_, value) in date_mentions(text) {
        push_unique(&mut out, value);
    }
    out
}

fn clock(hour: &str, minute: Option<&str>, meridiem: &str) -> Option<NaiveTime> {
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.map_or(Some(0), |m| m.parse().ok())?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match meridiem.to_lowercase().as_str() {
        "pm" => hour % 12 + 12,
        _ => hour % 12,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn hhmm(t: NaiveTime) -> Value {
    json!(t.format("%H:%M").to_string())
}

fn range_value(caps: &Captures<'_>) -> Value {
    let end_meridiem = &caps[6];
    let start_meridiem = caps.get(3).map_or(end_meridiem, |m| m.as_str());
    let from = clock(&caps[1], caps.get(2).map(|m| m.as_str()), start_meridiem);
    let to = clock(&caps[4], caps.get(5).map(|m| m.as_str()), end_meridiem);
    match (from, to) {
        (Some(from), Some(to)) => json!({ "from": hhmm(from), "to": hhmm(to) }),
        _ => json!(caps[0].trim()),
    }
}

fn times(text: &str) -> Vec<Value> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut found: Vec<(usize, Value)> = Vec::new();
    let overlaps = |spans: &[(usize, usize)], s: usize, e: usize| {
        spans.iter().any(|&(a, b)| s < b && a < e)
    };

    for caps in TIME_RANGE.captures_iter(text) {
        if let Some(m) = caps.get(0) {
            spans.push((m.start(), m.end()));
            found.push((m.start(), range_value(&caps)));
        }
    }
    for caps in TIME_12H.captures_iter(text) {
        if let Some(m) = caps.get(0)
            && !overlaps(&spans, m.start(), m.end())
        {
            let value = clock(&caps[1], caps.get(2).map(|m| m.as_str()), &caps[3])
                .map(hhmm)
                .unwrap_or_else(|| json!(m.as_str()));
            spans.push((m.start(), m.end()));
            found.push((m.start(), value));
        }
    }
    for caps in TIME_24H.captures_iter(text) {
        if let Some(m) = caps.get(0)
            && !overlaps(&spans, m.start(), m.end())
        {
            let value = NaiveTime::from_hms_opt(
                caps[1].parse().unwrap_or(99),
                caps[2].parse().unwrap_or(99),
                0,
            )
            .map(hhmm)
            .unwrap_or_else(|| json!(m.as_str()));
            found.push((m.start(), value));
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    let mut out = Vec::new();
    for (_, value) in found {
        push_unique(&mut out, value);
    }
    out
}

// ── Quantities ──────────────────────────────────────────────────────

fn currency(symbol: &str) -> &'static str {
    match symbol.to_lowercase().as_str() {
        "€" | "eur" => "EUR",
        "£" | "gbp" => "GBP",
        _ => "USD",
    }
}

fn amounts(text: &str) -> Vec<Value> {
    let mut out = Vec::new();
    for caps in MONEY.captures_iter(text) {
        push_unique(
            &mut out,
            json!({ "amount": number(&caps[2]), "currency": currency(&caps[1]) }),
        );
    }
    out
}

fn weights(text: &str) -> Vec<Value> {
    let mut out = Vec::new();
    for caps in WEIGHT.captures_iter(text) {
        let unit = if caps[2].to_lowercase().starts_with('k') {
            "kg"
        } else {
            "lb"
        };
        push_unique(&mut out, json!({ "value": number(&caps[1]), "unit": unit }));
    }
    out
}

fn dimension_unit(raw: &str) -> &'static str {
    match raw.to_lowercase().as_str() {
        "cm" => "cm",
        "mm" => "mm",
        "ft" | "feet" => "ft",
        _ => "in",
    }
}

fn dimensions(text: &str) -> Vec<Value> {
    let mut out = Vec::new();
    for caps in DIMENSIONS.captures_iter(text) {
        let mut dims = Map::new();
        dims.insert("length".into(), number(&caps[1]));
        dims.insert("width".into(), number(&caps[2]));
        if let Some(h) = caps.get(3) {
            dims.insert("height".into(), number(h.as_str()));
        }
        let unit = caps
            .get(4)
            .map(|u| dimension_unit(u.as_str()))
            .or_else(|| caps.get(5).map(|_| "in"));
        if let Some(unit) = unit {
            dims.insert("unit".into(), json!(unit));
        }
        push_unique(&mut out, Value::Object(dims));
    }
    out
}

fn unit_type(raw: &str) -> &'static str {
    match raw.to_lowercase().as_str() {
        "pallet" | "pallets" => "pallet",
        "skid" | "skids" => "skid",
        "carton" | "cartons" => "carton",
        "boxes" => "box",
        "cases" => "case",
        "crates" => "crate",
        "totes" => "tote",
        _ => "piece",
    }
}

fn handling_units(text: &str) -> Vec<Value> {
    let mut out = Vec::new();
    for caps in HANDLING_UNITS.captures_iter(text) {
        push_unique(
            &mut out,
            json!({ "count": number(&caps[1]), "type": unit_type(&caps[2]) }),
        );
    }
    out
}

// ── Parties and places ──────────────────────────────────────────────

fn lane(text: &str) -> Option<Value> {
    LANE.captures_iter(text).find_map(|caps| {
        let origin = caps[1].trim();
        let destination = caps[2].trim();
        let is_place = |s: &str| !NOT_PLACES.iter().any(|w| s.starts_with(w));
        (is_place(origin) && is_place(destination))
            .then(|| json!({ "origin": origin, "destination": destination }))
    })
}

fn carrier(text: &str) -> Option<String> {
    if let Some(caps) = CARRIER_LABEL.captures(text) {
        let name = caps[1].trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    CARRIER_NAME.captures(text).map(|caps| {
        let raw = &caps[1];
        match raw.to_lowercase().as_str() {
            "fedex" => "FedEx".to_string(),
            "old dominion" => "Old Dominion".to_string(),
            "estes" => "Estes".to_string(),
            "saia" => "Saia".to_string(),
            _ => raw.to_uppercase(),
        }
    })
}

fn addresses(text: &str) -> Vec<Value> {
    let mut out = Vec::new();
    for caps in ADDRESS.captures_iter(text) {
        push_unique(
            &mut out,
            json!({
                "street": caps[1].trim(),
                "city": caps[2].trim(),
                "state": &caps[3],
                "zip": &caps[4],
            }),
        );
    }
    out
}

// ── Requests ────────────────────────────────────────────────────────

fn requested_action(text: &str) -> Option<String> {
    if let Some(caps) = REQUEST.captures(text) {
        let action = caps[1].trim().trim_end_matches([',', '-', ':']).trim();
        if !action.is_empty() {
            return Some(action.to_string());
        }
    }
    ETA_NEEDED
        .is_match(text)
        .then(|| "provide updated ETA".to_string())
}

/// `Some(null)` when an ETA is mentioned without a usable value.
fn eta(text: &str) -> Option<Value> {
    let caps = ETA_CLAUSE.captures(text)?;
    let clause = caps.get(1).map_or("", |m| m.as_str());
    if ETA_NEEDED.is_match(text) {
        return Some(Value::Null);
    }
    let mut mentions = date_mentions(clause);
    if mentions.is_empty() {
        return Some(Value::Null);
    }
    Some(mentions.remove(0).1)
}
