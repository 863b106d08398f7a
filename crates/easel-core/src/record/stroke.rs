use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::{Draft, RawRecord, Record, RecordKind, Rejection};
use crate::env::Environment;

/// Stroke kind used when the client does not name one.
pub const DEFAULT_STROKE_KIND: &str = "line";

fn default_kind() -> String {
    DEFAULT_STROKE_KIND.to_string()
}

/// One validated drawing primitive: a segment from `(x0, y0)` to `(x1, y1)`.
///
/// Strokes carry no identity. Two strokes with equal fields are
/// indistinguishable and both are kept.
///
/// Coordinates and size keep the client's JSON number: `3` stays `3` and
/// `3.0` stays `3.0` when persisted and broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    x0: Number,
    y0: Number,
    x1: Number,
    y1: Number,
    color: String,
    size: Number,
    #[serde(rename = "type", alias = "kind", default = "default_kind")]
    kind: String,
}

impl Stroke {
    /// Segment start.
    pub fn start(&self) -> (f64, f64) {
        (as_f64(&self.x0), as_f64(&self.y0))
    }

    /// Segment end.
    pub fn end(&self) -> (f64, f64) {
        (as_f64(&self.x1), as_f64(&self.y1))
    }

    /// Stroke color, as sent by the client.
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Brush size.
    pub fn size(&self) -> f64 {
        as_f64(&self.size)
    }

    /// `x0`, `y0`, `x1`, `y1` and `size` as stored.
    pub fn numbers(&self) -> [&Number; 5] {
        [&self.x0, &self.y0, &self.x1, &self.y1, &self.size]
    }

    /// Primitive kind (`"line"` unless the client said otherwise).
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

fn as_f64(n: &Number) -> f64 {
    // Always `Some` without serde_json's arbitrary_precision feature.
    n.as_f64().unwrap_or(f64::NAN)
}

impl Record for Stroke {
    const KIND: RecordKind = RecordKind::Stroke;
    type Draft = StrokeDraft;
}

/// Stroke fields as read from untrusted input.
///
/// Validation is presence and type only. Coordinates and size may be any
/// number and `color` any string.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeDraft {
    x0: Result<Number, Rejection>,
    y0: Result<Number, Rejection>,
    x1: Result<Number, Rejection>,
    y1: Result<Number, Rejection>,
    color: Result<String, Rejection>,
    size: Result<Number, Rejection>,
    kind: String,
}

impl Draft for StrokeDraft {
    type Record = Stroke;

    fn from_raw(raw: &RawRecord) -> Self {
        let kind = raw
            .optional_string("type")
            .or_else(|| raw.optional_string("kind"))
            .map_or_else(default_kind, str::to_string);

        Self {
            x0: raw.number("x0"),
            y0: raw.number("y0"),
            x1: raw.number("x1"),
            y1: raw.number("y1"),
            color: raw.string("color").map(str::to_string),
            size: raw.number("size"),
            kind,
        }
    }

    fn check(&self) -> Result<(), Rejection> {
        for coord in [&self.x0, &self.y0, &self.x1, &self.y1] {
            coord.as_ref().map_err(Clone::clone)?;
        }
        self.color.as_ref().map_err(Clone::clone)?;
        self.size.as_ref().map_err(Clone::clone)?;
        Ok(())
    }

    fn finish<E: Environment>(self, _env: &E) -> Result<Stroke, Rejection> {
        Ok(Stroke {
            x0: self.x0?,
            y0: self.y0?,
            x1: self.x1?,
            y1: self.y1?,
            color: self.color?,
            size: self.size?,
            kind: self.kind,
        })
    }
}
