//! Ball-tracking subprocess feed.
//!
//! The tracker prints one line per camera frame with six whitespace separated
//! numbers, the ball position and setpoint already projected onto each servo
//! axis:
//!
//! ```text
//! posTop setpointTop posLeft setpointLeft posRight setpointRight
//! ```
//!
//! A malformed line does not stop the loop: it is logged, counted and the
//! previous readings are kept.

use std::io::BufRead;

use crate::utils::controllers::AxisReadings;

/// Values expected on every tracking line.
pub const TOKENS_PER_LINE: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("malformed tracking line ({reason}): {line:?}")]
    MalformedInput { line: String, reason: &'static str },
    #[error("tracking feed I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of reading one line from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// The readings were replaced with the new line's values.
    Updated,
    /// The line was malformed; the readings are unchanged.
    Skipped,
    /// The tracker closed its output.
    Ended,
}

/// Parse one tracking line. Tokens after the sixth are ignored.
pub fn parse_tracking_line(line: &str) -> Result<AxisReadings, TrackingError> {
    let malformed = |reason| TrackingError::MalformedInput {
        line: line.trim_end().to_string(),
        reason,
    };

    let mut values = [0.0f32; TOKENS_PER_LINE];
    let mut tokens = line.split_whitespace();
    for v in values.iter_mut() {
        let token = tokens.next().ok_or_else(|| malformed("expected six values"))?;
        *v = token.parse().map_err(|_| malformed("non-numeric value"))?;
    }

    Ok(AxisReadings {
        position: [values[0], values[2], values[4]],
        setpoint: [values[1], values[3], values[5]],
    })
}

/// Blocking line reader over the tracker's stdout.
pub struct TrackingFeed<R> {
    reader: R,
    line: Vec<u8>,
    skipped: u64,
}

impl<R: BufRead> TrackingFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            skipped: 0,
        }
    }

    /// Block for the next line and apply it to `readings`.
    ///
    /// Only I/O failures are returned as errors.
    pub fn next(
        &mut self,
        readings: &mut AxisReadings,
    ) -> Result<FeedStatus, TrackingError> {
        self.line.clear();
        if self.reader.read_until(b'\n', &mut self.line)? == 0 {
            tracing::info!("tracking feed ended");
            return Ok(FeedStatus::Ended);
        }

        let parsed = match core::str::from_utf8(&self.line) {
            Ok(line) => parse_tracking_line(line),
            Err(_) => Err(TrackingError::MalformedInput {
                line: String::from_utf8_lossy(&self.line).trim_end().to_string(),
                reason: "invalid UTF-8",
            }),
        };
        match parsed {
            Ok(r) => {
                *readings = r;
                Ok(FeedStatus::Updated)
            }
            Err(error) => {
                self.skipped += 1;
                tracing::warn!(%error, skipped = self.skipped, "ignoring tracking line");
                Ok(FeedStatus::Skipped)
            }
        }
    }

    /// Number of malformed lines ignored so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_full_line() {
        let r = parse_tracking_line("1.5 2 -3 4.25 5 6\n").unwrap();
        assert_eq!(r.position, [1.5, -3.0, 5.0]);
        assert_eq!(r.setpoint, [2.0, 4.25, 6.0]);
    }

    #[test]
    fn test_extra_tokens_are_ignored() {
        let r = parse_tracking_line("1 2 3 4 5 6 7 8").unwrap();
        assert_eq!(r.setpoint, [2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_short_line_is_malformed() {
        assert!(matches!(
            parse_tracking_line("1 2 3"),
            Err(TrackingError::MalformedInput { reason: "expected six values", .. })
        ));
        assert!(matches!(
            parse_tracking_line("1 2 3 x 5 6"),
            Err(TrackingError::MalformedInput { reason: "non-numeric value", .. })
        ));
    }

    #[test]
    fn test_malformed_line_leaves_readings_unchanged() {
        let input = "1 2 3 4 5 6\n7 8 9\n\n10 11 12 13 14 15\n";
        let mut feed = TrackingFeed::new(Cursor::new(input));
        let mut readings = AxisReadings::default();

        assert_eq!(feed.next(&mut readings).unwrap(), FeedStatus::Updated);
        let before = readings;
        assert_eq!(feed.next(&mut readings).unwrap(), FeedStatus::Skipped);
        assert_eq!(readings, before);
        assert_eq!(feed.next(&mut readings).unwrap(), FeedStatus::Skipped);
        assert_eq!(readings, before);
        assert_eq!(feed.skipped(), 2);

        assert_eq!(feed.next(&mut readings).unwrap(), FeedStatus::Updated);
        assert_eq!(readings.position, [10.0, 12.0, 14.0]);
        assert_eq!(feed.next(&mut readings).unwrap(), FeedStatus::Ended);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let input: &[u8] = b"1 2 3 4 5 6\n\xff\xfe 1 2\n7 8 9 10 11 12\n";
        let mut feed = TrackingFeed::new(input);
        let mut readings = AxisReadings::default();

        assert_eq!(feed.next(&mut readings).unwrap(), FeedStatus::Updated);
        let before = readings;
        assert_eq!(feed.next(&mut readings).unwrap(), FeedStatus::Skipped);
        assert_eq!(readings, before);
        assert_eq!(feed.skipped(), 1);

        assert_eq!(feed.next(&mut readings).unwrap(), FeedStatus::Updated);
        assert_eq!(readings.position, [7.0, 9.0, 11.0]);
        assert_eq!(feed.next(&mut readings).unwrap(), FeedStatus::Ended);
    }
}
