//! Decides whether an activity carries an outdoor GPS track worth exporting.

use crate::garmin::ActivityMeta;

/// Activity type keys that never produce a meaningful GPS track.
const INDOOR_TYPE_KEYS: [&str; 4] = [
	"indoor_cycling",
	"indoor_rowing",
	"treadmill_running",
	"indoor_swimming",
];

/// Name fragments that mark an activity as indoor or stationary.
/// "划船机" is the rowing machine name used by the Chinese Garmin Connect locale.
const INDOOR_NAME_KEYWORDS: [&str; 7] = [
	"indoor",
	"cycling",
	"treadmill",
	"rowing",
	"elliptical",
	"trainer",
	"划船机",
];

/// Returns `false` for indoor activities; first matching rule wins.
pub fn is_exportable(activity: &ActivityMeta) -> bool {
	if activity.is_indoor {
		return false;
	}

	let type_key = activity.activity_type_key.to_lowercase();
	if INDOOR_TYPE_KEYS.contains(&type_key.as_str()) {
		return false;
	}

	let name = activity.name.to_lowercase();
	!INDOOR_NAME_KEYWORDS
		.iter()
		.any(|keyword| name.contains(keyword))
}
