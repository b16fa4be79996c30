use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use ember_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let mut table = root.as_table_mut().expect("Sample config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Sample config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("ember_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> Result<Config, Error> {
	let path = write_temp_config(payload);
	let result = ember_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation(payload: String, expected: &str) {
	let err = load_payload(payload).expect_err("Expected a validation error.");
	let message = err.to_string();

	assert!(message.contains(expected), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads() {
	let cfg = load_payload(SAMPLE_CONFIG_TOML.to_string()).expect("Sample config must load.");

	assert_eq!(cfg.service.worker_id.as_deref(), Some("worker-a"));
	assert_eq!(cfg.passive.lease_seconds, 180);
	assert_eq!(cfg.passive.poll_interval_ms, 1_500);
	assert_eq!(cfg.memory.capacity, 200);
	assert!(cfg.providers.embedding.is_some());
}

#[test]
fn memory_and_passive_sections_default_when_missing() {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let table = root.as_table_mut().expect("Sample config must be a table.");

	table.remove("memory");
	table.remove("passive");

	let cfg = load_payload(toml::to_string(&root).expect("Failed to render config."))
		.expect("Config without optional sections must load.");

	assert_eq!(cfg.passive.max_attempts, 3);
	assert_eq!(cfg.passive.chars_per_token, 4);
	assert!(cfg.memory.enabled);
	assert!((cfg.memory.similarity_weight - 1.0).abs() < f32::EPSILON);
}

#[test]
fn blank_api_keys_normalize_to_none() {
	let payload = sample_with("providers.llm", "api_key", Value::String("   ".to_string()));
	let cfg = load_payload(payload).expect("Blank api_key must not fail loading.");

	assert!(cfg.providers.llm.api_key.is_none());
}

#[test]
fn blank_worker_id_normalizes_to_none() {
	let payload = sample_with("service", "worker_id", Value::String(String::new()));
	let cfg = load_payload(payload).expect("Blank worker_id must not fail loading.");

	assert!(cfg.service.worker_id.is_none());
}

#[test]
fn lease_seconds_must_be_positive() {
	expect_validation(
		sample_with("passive", "lease_seconds", Value::Integer(0)),
		"passive.lease_seconds must be greater than zero.",
	);
}

#[test]
fn max_attempts_must_be_positive() {
	expect_validation(
		sample_with("passive", "max_attempts", Value::Integer(0)),
		"passive.max_attempts must be greater than zero.",
	);
}

#[test]
fn decay_rate_must_be_a_fraction() {
	expect_validation(
		sample_with("memory", "decay_rate", Value::Float(1.5)),
		"memory.decay_rate must be in the range 0.0-1.0.",
	);
}

#[test]
fn similarity_weight_must_not_be_negative() {
	expect_validation(
		sample_with("memory", "similarity_weight", Value::Float(-0.5)),
		"memory.similarity_weight must be a finite number, zero or greater.",
	);
}

#[test]
fn capacity_must_be_positive() {
	expect_validation(
		sample_with("memory", "capacity", Value::Integer(0)),
		"memory.capacity must be greater than zero.",
	);
}

#[test]
fn embedding_dimensions_must_be_positive() {
	expect_validation(
		sample_with("providers.embedding", "dimensions", Value::Integer(0)),
		"providers.embedding.dimensions must be greater than zero.",
	);
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("ember_config_test_does_not_exist.toml");
	let err = ember_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}
