//! Wire frames and the decoder that validates them.
//!
//! Producers send one JSON object per text message:
//!
//! ```text
//! { "bins": [0.12, 0.5, ...], "centers": [20.4, 22.7, ...] }
//! ```
//!
//! Nothing past [`FrameDecoder::decode`] ever sees a `serde_json::Value`. Every
//! bin is coerced to a finite `f64` at this boundary, so NaN and infinities
//! never reach the color scale or the renderers.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

/// One decoded snapshot of spectral magnitudes.
#[derive(Debug, Clone, PartialEq)]
pub struct BinFrame {
    /// Magnitudes, one per frequency band, already coerced to finite numbers.
    pub bins: Vec<f64>,
    /// Frequency centers (Hz) latched for the session, if any frame carried them.
    pub centers: Option<Arc<[f64]>>,
}

impl BinFrame {
    /// A frame with no known centers.
    pub fn new(bins: Vec<f64>) -> Self {
        Self {
            bins,
            centers: None,
        }
    }

    /// Number of bins in this frame.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Copy the bins into a history row.
    pub fn to_row(&self) -> BinRow {
        BinRow::new(self.bins.clone())
    }
}

/// A frame's bins as stored in the history buffer.
///
/// The width is fixed at capture time. Rows captured before a bin-count change
/// keep their original width; reads past the end yield 0.
#[derive(Debug, Clone, PartialEq)]
pub struct BinRow {
    values: Box<[f64]>,
}

impl BinRow {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values: values.into_boxed_slice(),
        }
    }

    /// Bin count at capture time.
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// Value at bin `x`, or 0 when the row is narrower than `x + 1`.
    pub fn get(&self, x: usize) -> f64 {
        self.values.get(x).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Largest value in the row, never below 0.
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

impl From<Vec<f64>> for BinRow {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Parses text payloads into [`BinFrame`]s and latches the session's centers.
#[derive(Debug, Default, Clone)]
pub struct FrameDecoder {
    centers: Option<Arc<[f64]>>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one message.
    ///
    /// Returns `None` for anything that is not a JSON object with a `bins`
    /// array. A rejected message leaves the decoder untouched. `centers` is
    /// captured from the first accepted message that carries an array and is
    /// never replaced afterwards.
    pub fn decode(&mut self, payload: &str) -> Option<BinFrame> {
        let msg: Value = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(e) => {
                log::trace!("dropping unparsable message: {e}");
                return None;
            }
        };

        let Some(Value::Array(raw_bins)) = msg.get("bins") else {
            log::trace!("dropping message without a bins array");
            return None;
        };
        let bins: Vec<f64> = raw_bins.iter().map(coerce_number).collect();

        if self.centers.is_none()
            && let Some(Value::Array(raw_centers)) = msg.get("centers")
        {
            let centers: Vec<f64> = raw_centers.iter().map(coerce_number).collect();
            log::debug!("captured {} frequency centers", centers.len());
            self.centers = Some(centers.into());
        }

        Some(BinFrame {
            bins,
            centers: self.centers.clone(),
        })
    }

    /// Centers latched for this session, if any message carried them.
    pub fn centers(&self) -> Option<&[f64]> {
        self.centers.as_deref()
    }
}

/// Interpret a JSON value as a finite number, falling back to 0.
///
/// Numbers pass through, numeric strings are parsed, booleans count as 1/0,
/// and everything else (null, arrays, objects, garbage strings) becomes 0.
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Encoding (producer side)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct WireFrame<'a> {
    bins: &'a [f32],
    #[serde(skip_serializing_if = "Option::is_none")]
    centers: Option<&'a [f32]>,
}

/// Serialize a producer frame as the single JSON object viewers expect.
pub fn encode_frame(bins: &[f32], centers: Option<&[f32]>) -> String {
    // A struct of two float slices cannot fail to serialize; non-finite
    // floats are written as `null`, which viewers coerce to 0.
    serde_json::to_string(&WireFrame { bins, centers }).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_coerces_non_numeric_bins_to_zero() {
        let mut dec = FrameDecoder::new();
        let frame = dec.decode(r#"{"bins":[1,2,"x",null]}"#).unwrap();
        assert_eq!(frame.bins, vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(frame.to_row().values(), &[1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn decode_rejects_non_json() {
        let mut dec = FrameDecoder::new();
        assert!(dec.decode("not json").is_none());
        assert!(dec.centers().is_none());
    }

    #[test]
    fn decode_rejects_missing_bins() {
        let mut dec = FrameDecoder::new();
        assert!(dec.decode(r#"{"nope":1}"#).is_none());
        assert!(dec.decode(r#"{"bins":7}"#).is_none());
        assert!(dec.decode("[1,2,3]").is_none());
    }

    #[test]
    fn rejected_message_does_not_capture_centers() {
        let mut dec = FrameDecoder::new();
        assert!(dec.decode(r#"{"centers":[1,2]}"#).is_none());
        assert!(dec.centers().is_none());
    }

    #[test]
    fn centers_latch_on_first_observation() {
        let mut dec = FrameDecoder::new();
        let first = dec.decode(r#"{"bins":[1],"centers":[20,40]}"#).unwrap();
        assert_eq!(first.centers.as_deref(), Some(&[20.0, 40.0][..]));

        let second = dec.decode(r#"{"bins":[2],"centers":[99,100,101]}"#).unwrap();
        assert_eq!(second.centers.as_deref(), Some(&[20.0, 40.0][..]));

        let third = dec.decode(r#"{"bins":[3]}"#).unwrap();
        assert_eq!(third.centers.as_deref(), Some(&[20.0, 40.0][..]));
    }

    #[test]
    fn centers_that_are_not_arrays_are_ignored() {
        let mut dec = FrameDecoder::new();
        let frame = dec.decode(r#"{"bins":[1],"centers":"low"}"#).unwrap();
        assert!(frame.centers.is_none());
        dec.decode(r#"{"bins":[1],"centers":[5]}"#).unwrap();
        assert_eq!(dec.centers(), Some(&[5.0][..]));
    }

    #[test]
    fn coerce_handles_strings_and_bools() {
        assert_eq!(coerce_number(&Value::from(" 2.5 ")), 2.5);
        assert_eq!(coerce_number(&Value::from("")), 0.0);
        assert_eq!(coerce_number(&Value::from("inf")), 0.0);
        assert_eq!(coerce_number(&Value::from("NaN")), 0.0);
        assert_eq!(coerce_number(&Value::Bool(true)), 1.0);
        assert_eq!(coerce_number(&Value::Bool(false)), 0.0);
        assert_eq!(coerce_number(&serde_json::json!([4])), 0.0);
    }

    #[test]
    fn row_reads_past_end_as_zero() {
        let row = BinRow::new(vec![3.0, -1.0]);
        assert_eq!(row.width(), 2);
        assert_eq!(row.get(0), 3.0);
        assert_eq!(row.get(5), 0.0);
        assert_eq!(row.max(), 3.0);
        assert_eq!(BinRow::new(vec![-4.0]).max(), 0.0);
    }

    #[test]
    fn encoded_frames_decode_back() {
        let payload = encode_frame(&[0.25, 0.5], Some(&[100.0, 200.0]));
        let mut dec = FrameDecoder::new();
        let frame = dec.decode(&payload).unwrap();
        assert_eq!(frame.bins, vec![0.25, 0.5]);
        assert_eq!(dec.centers(), Some(&[100.0, 200.0][..]));

        let bare = encode_frame(&[1.0], None);
        assert_eq!(bare, r#"{"bins":[1.0]}"#);
    }
}
