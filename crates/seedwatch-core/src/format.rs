//! Human-readable renderings of byte counts, rates, percentages and durations.

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;
const TIB: u64 = GIB * 1024;

/// Thresholds in descending order; the first one not above the value wins.
const SIZE_UNITS: [(u64, &str); 5] = [(TIB, "TB"), (GIB, "GB"), (MIB, "MB"), (KIB, "KB"), (1, "b")];

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const YEAR: u64 = 52 * WEEK;

struct DurationUnit {
    length: u64,
    /// Label used when pluralisation is off.
    fixed: &'static str,
    singular: &'static str,
    plural: &'static str,
}

const DURATION_UNITS: [DurationUnit; 5] = [
    DurationUnit { length: YEAR, fixed: "yrs", singular: "yr", plural: "yrs" },
    DurationUnit { length: WEEK, fixed: "wks", singular: "wk", plural: "wks" },
    DurationUnit { length: DAY, fixed: "days", singular: "day", plural: "days" },
    DurationUnit { length: HOUR, fixed: "hr", singular: "hr", plural: "hrs" },
    DurationUnit { length: MINUTE, fixed: "min", singular: "min", plural: "mins" },
];

/// Render a byte count with the largest fitting binary unit, e.g. `"1.5 KB"`.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    let (value, unit) = scale_size(bytes);
    format!("{value} {unit}")
}

/// Render a byte count like [`format_size`] without the unit label.
#[must_use]
pub fn format_size_bare(bytes: u64) -> String {
    scale_size(bytes).0
}

/// Render a throughput in bytes per second, e.g. `"150 KB/s"`.
#[must_use]
pub fn format_rate(bytes_per_second: u64) -> String {
    format!("{}/s", format_size(bytes_per_second))
}

/// Render a completion percentage with at most one decimal, e.g. `"56.3%"`.
#[must_use]
pub fn format_percent(percent: f64) -> String {
    format!("{}%", one_decimal(percent))
}

/// Render a duration as its non-zero units, largest first, e.g. `"2 hr 32 min"`.
///
/// Seconds are never shown; anything under a minute renders as an empty string.
#[must_use]
pub fn format_duration(seconds: u64) -> String {
    render_duration(seconds, |unit, _| unit.fixed)
}

/// Render a duration like [`format_duration`] with singular/plural unit labels,
/// e.g. `"1 day 3 hrs"`.
#[must_use]
pub fn format_duration_plural(seconds: u64) -> String {
    render_duration(seconds, |unit, value| {
        if value > 1 { unit.plural } else { unit.singular }
    })
}

fn render_duration(seconds: u64, label: impl Fn(&DurationUnit, u64) -> &'static str) -> String {
    let mut remaining = seconds;
    let mut parts = Vec::new();
    for unit in &DURATION_UNITS {
        if remaining < MINUTE {
            break;
        }
        let value = remaining / unit.length;
        if value > 0 {
            remaining %= unit.length;
            parts.push(format!("{value} {}", label(unit, value)));
        }
    }
    parts.join(" ")
}

fn scale_size(bytes: u64) -> (String, &'static str) {
    let (divisor, unit) = SIZE_UNITS
        .iter()
        .copied()
        .find(|(threshold, _)| bytes >= *threshold)
        .unwrap_or((1, "b"));
    (one_decimal(to_f64(bytes) / to_f64(divisor)), unit)
}

fn one_decimal(value: f64) -> String {
    let text = format!("{value:.1}");
    let trimmed = text.strip_suffix(".0").unwrap_or(&text);
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

const fn to_f64(value: u64) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "sizes are rendered with one decimal place"
    )]
    {
        value as f64
    }
}
