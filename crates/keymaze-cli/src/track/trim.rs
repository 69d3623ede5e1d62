use std::str::FromStr;

use tracing::warn;

use crate::error::{KeymazeError, Result};
use crate::models::TrackPoint;

/// Where a trim offset is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `+`: forward from the track start
    FromStart,
    /// `-`: backward from the track end
    FromEnd,
    /// No sign; absolute times are not supported, the natural boundary is used
    Unanchored,
}

/// One trim boundary, e.g. `+00:10:00`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimSpec {
    pub anchor: Anchor,
    pub seconds: u32,
}

impl TrimSpec {
    /// Resolve to an absolute time, or `natural` when unanchored
    fn resolve(self, start: i64, end: i64, natural: i64) -> i64 {
        match self.anchor {
            Anchor::FromStart => start + i64::from(self.seconds),
            Anchor::FromEnd => end - i64::from(self.seconds),
            Anchor::Unanchored => {
                warn!("Unsigned trim time is not supported, using the track boundary");
                natural
            }
        }
    }
}

impl FromStr for TrimSpec {
    type Err = KeymazeError;

    /// Parse `[+-][HH:][MM:]SS`, every field being exactly two digits
    ///
    /// Hours are only accepted together with minutes.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || KeymazeError::InvalidTrim(s.to_string());

        let (anchor, rest) = match s.as_bytes().first() {
            Some(b'+') => (Anchor::FromStart, &s[1..]),
            Some(b'-') => (Anchor::FromEnd, &s[1..]),
            _ => (Anchor::Unanchored, s),
        };

        let fields: Vec<&str> = rest.split(':').collect();
        if fields.len() > 3 {
            return Err(invalid());
        }
        let mut seconds = 0u32;
        for field in &fields {
            if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let value: u32 = field.parse().map_err(|_| invalid())?;
            seconds = seconds * 60 + value;
        }

        Ok(Self { anchor, seconds })
    }
}

/// Parse a comma-separated `start[,end]` trim option
pub fn parse_trims(s: &str) -> Result<Vec<TrimSpec>> {
    let specs = s
        .split(',')
        .map(|part| part.trim().parse())
        .collect::<Result<Vec<TrimSpec>>>()?;
    if specs.len() > 2 {
        return Err(KeymazeError::invalid_param(format!(
            "at most two trim times expected, got {}",
            specs.len()
        )));
    }
    Ok(specs)
}

/// Keep the points recorded within the trim window
///
/// `start` is the track start (epoch seconds) and `duration` its length in
/// seconds. Point times are rebuilt by summing deltas (tenths of a second)
/// from the start; bounds are inclusive. Without a second spec the window
/// ends with the track.
pub fn trim(points: &[TrackPoint], start: i64, duration: u32, trims: &[TrimSpec]) -> Vec<TrackPoint> {
    let Some(first) = trims.first() else {
        return points.to_vec();
    };
    let end = start + i64::from(duration);

    let t_start = first.resolve(start, end, start) * 10;
    let t_end = trims
        .get(1)
        .map_or(end, |spec| spec.resolve(start, end, end))
        * 10;

    let mut elapsed = start * 10;
    points
        .iter()
        .filter(|p| {
            elapsed += i64::from(p.delta);
            (t_start..=t_end).contains(&elapsed)
        })
        .copied()
        .collect()
}
