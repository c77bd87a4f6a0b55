use crate::sync::types::GeoPoint;

/// Keep only points strictly newer than `high_water_mark`, in their original order.
///
/// A point stamped exactly at the mark was already delivered.
pub fn filter_new(points: &[GeoPoint], high_water_mark: i64) -> Vec<GeoPoint> {
	points
		.iter()
		.filter(|point| point.timestamp > high_water_mark)
		.copied()
		.collect()
}

/// Highest timestamp in a batch, used to advance the watermark after upload.
pub fn max_timestamp(points: &[GeoPoint]) -> Option<i64> {
	points.iter().map(|point| point.timestamp).max()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn point(timestamp: i64) -> GeoPoint {
		GeoPoint {
			timestamp,
			latitude: 0.0,
			longitude: 0.0,
			altitude: 0.0,
		}
	}

	fn timestamps(points: &[GeoPoint]) -> Vec<i64> {
		points.iter().map(|p| p.timestamp).collect()
	}

	#[test]
	fn test_filter_new_is_strictly_greater() {
		let points = vec![point(100), point(200), point(300)];

		assert_eq!(timestamps(&filter_new(&points, 150)), vec![200, 300]);
		assert_eq!(timestamps(&filter_new(&points, 200)), vec![300]);
		assert!(filter_new(&points, 300).is_empty());
	}

	#[test]
	fn test_filter_new_preserves_order_of_unsorted_input() {
		let points = vec![point(50), point(400), point(10), point(250)];
		assert_eq!(timestamps(&filter_new(&points, 40)), vec![50, 400, 250]);
	}

	#[test]
	fn test_filter_new_is_idempotent() {
		let points = vec![point(5), point(15), point(9), point(30)];
		for mark in [0, 9, 10, 30, 31] {
			let once = filter_new(&points, mark);
			assert_eq!(filter_new(&once, mark), once);
		}
	}

	#[test]
	fn test_max_timestamp() {
		assert_eq!(max_timestamp(&[point(3), point(9), point(4)]), Some(9));
		assert_eq!(max_timestamp(&[]), None);
	}
}
