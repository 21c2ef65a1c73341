use serde::Serialize;
use thiserror::Error;

/// One labelled quantity from a nutrition summary, ready for charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionSlice {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum NutritionError {
    #[error("line {line}: no numeric value in {text:?}")]
    EmptyValue { line: usize, text: String },

    #[error("line {line}: {value:?} is not a number")]
    InvalidNumber {
        line: usize,
        value: String,
        text: String,
    },
}

/// Parse one `Label: value` line.
///
/// Returns `None` for lines without a colon. The value keeps only ASCII digits
/// and periods, so `"250 kcal"` reads as 250 and `"1.2.3"` is an error.
pub fn parse_line(line_no: usize, line: &str) -> Option<Result<NutritionSlice, NutritionError>> {
    let (label, raw) = line.split_once(':')?;
    let numeric: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if numeric.is_empty() {
        return Some(Err(NutritionError::EmptyValue {
            line: line_no,
            text: line.to_string(),
        }));
    }

    Some(
        numeric
            .parse::<f64>()
            .map(|value| NutritionSlice {
                label: label.trim().to_string(),
                value,
            })
            .map_err(|_| NutritionError::InvalidNumber {
                line: line_no,
                value: numeric.clone(),
                text: line.to_string(),
            }),
    )
}

/// Parse a whole summary, failing on the first line with an unreadable value.
pub fn parse_nutrition(text: &str) -> Result<Vec<NutritionSlice>, NutritionError> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| parse_line(i + 1, line))
        .collect()
}

/// Parse a whole summary, skipping lines with unreadable values.
/// Skipped lines are returned alongside so the caller can report them.
pub fn parse_nutrition_lenient(text: &str) -> (Vec<NutritionSlice>, Vec<NutritionError>) {
    let mut slices = Vec::new();
    let mut skipped = Vec::new();
    for (i, line) in text.lines().enumerate() {
        match parse_line(i + 1, line) {
            Some(Ok(slice)) => slices.push(slice),
            Some(Err(e)) => skipped.push(e),
            None => {}
        }
    }
    (slices, skipped)
}

/// Pie-chart projection of a set of slices.
#[derive(Debug, Clone, Serialize)]
pub struct NutritionChart {
    pub slices: Vec<NutritionSlice>,
    pub total: f64,
}

impl NutritionChart {
    pub fn new(slices: Vec<NutritionSlice>) -> Self {
        let total = slices.iter().map(|s| s.value).sum();
        Self { slices, total }
    }

    /// Share of the whole for each slice. Empty when the total is zero.
    pub fn shares(&self) -> Vec<(&str, f64)> {
        if self.total <= 0.0 {
            return Vec::new();
        }
        self.slices
            .iter()
            .map(|s| (s.label.as_str(), s.value / self.total))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}
