//! GPX trace parsing.
//!
//! Turns a raw GPX export into ordered [`GeoPoint`]s. Only a structurally broken
//! document is an error; trackpoints without usable coordinates or time are
//! dropped one by one and parsing carries on.

use crate::sync::types::GeoPoint;

use chrono::NaiveDateTime;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

/// Length of `YYYY-MM-DDTHH:MM:SS`, the part of a GPX time kept for parsing.
const TIMESTAMP_PREFIX_LEN: usize = 19;

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
	#[error("Malformed trace document: {0}")]
	Malformed(String),
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
	Time,
	Elevation,
}

/// Trackpoint fields collected between `<trkpt>` and `</trkpt>`.
#[derive(Default)]
struct PendingPoint {
	latitude: Option<f64>,
	longitude: Option<f64>,
	time: Option<String>,
	elevation: Option<String>,
}

impl PendingPoint {
	fn from_start(element: &BytesStart) -> Self {
		Self {
			latitude: coordinate(element, "lat"),
			longitude: coordinate(element, "lon"),
			..Self::default()
		}
	}

	fn finish(self) -> Option<GeoPoint> {
		let latitude = self.latitude?;
		let longitude = self.longitude?;
		let timestamp = parse_timestamp(self.time.as_deref()?)?;
		let altitude = match self.elevation {
			Some(ele) => ele.trim().parse::<f64>().ok()?,
			None => 0.0,
		};

		Some(GeoPoint {
			timestamp,
			latitude,
			longitude,
			altitude,
		})
	}
}

fn coordinate(element: &BytesStart, name: &str) -> Option<f64> {
	let attr = element.try_get_attribute(name).ok().flatten()?;
	attr.unescape_value().ok()?.trim().parse::<f64>().ok()
}

/// Parse a GPX time into epoch seconds, UTC.
///
/// Fractional seconds and any zone suffix are cut off before parsing.
pub fn parse_timestamp(value: &str) -> Option<i64> {
	let head = value.trim().get(..TIMESTAMP_PREFIX_LEN)?;
	let naive = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S").ok()?;
	Some(naive.and_utc().timestamp())
}

/// Parse a GPX payload into points in document order.
pub fn parse(raw: &[u8]) -> Result<Vec<GeoPoint>, TraceError> {
	let mut reader = Reader::from_reader(raw);
	reader.config_mut().trim_text(true);

	let mut points = Vec::new();
	let mut skipped = 0usize;
	let mut pending: Option<PendingPoint> = None;
	let mut field: Option<Field> = None;
	let mut depth = 0usize;
	let mut saw_root = false;

	loop {
		let event = reader.read_event().map_err(|e| {
			TraceError::Malformed(format!(
				"{} at byte {}",
				e,
				reader.error_position()
			))
		})?;

		match event {
			Event::Start(element) => {
				depth += 1;
				saw_root = true;
				match element.local_name().as_ref() {
					b"trkpt" => pending = Some(PendingPoint::from_start(&element)),
					b"time" if pending.is_some() => field = Some(Field::Time),
					b"ele" if pending.is_some() => field = Some(Field::Elevation),
					_ => {}
				}
			}
			Event::Empty(element) => {
				saw_root = true;
				if element.local_name().as_ref() == b"trkpt" {
					// A self-closing trackpoint has no time child.
					skipped += 1;
				}
			}
			Event::Text(text) => {
				if let (Some(point), Some(target)) = (pending.as_mut(), field) {
					let value = text
						.unescape()
						.map_err(|e| TraceError::Malformed(e.to_string()))?
						.into_owned();
					match target {
						Field::Time => point.time = Some(value),
						Field::Elevation => point.elevation = Some(value),
					}
				}
			}
			Event::End(element) => {
				depth = depth.saturating_sub(1);
				match element.local_name().as_ref() {
					b"trkpt" => {
						if let Some(point) = pending.take() {
							match point.finish() {
								Some(point) => points.push(point),
								None => skipped += 1,
							}
						}
					}
					b"time" | b"ele" => field = None,
					_ => {}
				}
			}
			Event::Eof => break,
			_ => {}
		}
	}

	if !saw_root {
		return Err(TraceError::Malformed("no root element".to_string()));
	}
	if depth != 0 {
		return Err(TraceError::Malformed(format!(
			"{} unclosed element(s) at end of document",
			depth
		)));
	}

	debug!(
		"Parsed {} trackpoints ({} skipped)",
		points.len(),
		skipped
	);
	Ok(points)
}
