use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use savor_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &[&str], key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let mut table = root.as_table_mut().expect("Template config must be a table.");

	for name in section {
		table = table
			.get_mut(*name)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{name}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
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

	path.push(format!("savor_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> savor_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = savor_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation(payload: String, expected: &str) {
	let err = load_payload(payload).expect_err("Expected validation error.");

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error kind: {err:?}");

	let message = err.to_string();

	assert!(message.contains(expected), "Unexpected error message: {message}");
}

#[test]
fn loads_template_and_normalizes_blank_params_path() {
	let cfg = load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string()).expect("Failed to load config.");

	assert_eq!(cfg.providers.sparse.params_path, None);
	assert_eq!(cfg.storage.qdrant.ingredients_vector, "ingredients");
	assert_eq!(cfg.storage.qdrant.content_vector, "content");
	assert_eq!(cfg.retrieval.rrf_k, 60);
	assert_eq!(cfg.rerank.blend_lambda, 0.9);
}

#[test]
fn missing_sections_fall_back_to_defaults() {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse.");
	let table = root.as_table_mut().expect("Template config must be a table.");

	table.remove("retrieval");
	table.remove("rerank");

	let cfg = load_payload(toml::to_string(&root).expect("Failed to render."))
		.expect("Failed to load config.");

	assert_eq!(cfg.retrieval.top_k, 50);
	assert_eq!(cfg.retrieval.top_n, Some(50));
	assert_eq!(cfg.service.session_idle_ttl_secs, 1_800);
	assert_eq!(cfg.service.max_sessions, 10_000);
	assert_eq!(cfg.retrieval.retry.max_attempts, 3);
	assert!((cfg.retrieval.similarity_threshold - 0.7).abs() < f32::EPSILON);
	assert!((cfg.rerank.mmr_lambda - 0.7).abs() < f32::EPSILON);
	assert!((cfg.rerank.learning_rate - 0.8).abs() < f32::EPSILON);
	assert!((cfg.rerank.blend_lambda - 0.9).abs() < f32::EPSILON);
}

#[test]
fn fused_limit_follows_top_k_when_unset() {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse.");
	let retrieval = root
		.get_mut("retrieval")
		.and_then(Value::as_table_mut)
		.expect("Template config must include [retrieval].");

	retrieval.remove("top_n");
	retrieval.insert("top_k".to_string(), Value::Integer(10));

	let cfg = load_payload(toml::to_string(&root).expect("Failed to render."))
		.expect("Failed to load config.");

	assert_eq!(cfg.retrieval.top_n, Some(10));
	assert_eq!(cfg.retrieval.fused_limit(), 10);

	let explicit = load_payload(sample_toml_with(&["retrieval"], "top_n", Value::Integer(5)))
		.expect("Failed to load config.");

	assert_eq!(explicit.retrieval.fused_limit(), 5);
}

#[test]
fn session_cap_must_be_positive() {
	let payload = sample_toml_with(&["service"], "max_sessions", Value::Integer(0));

	expect_validation(payload, "service.max_sessions must be greater than zero.");
}

#[test]
fn dimensions_must_match_vector_dim() {
	let payload =
		sample_toml_with(&["providers", "embedding"], "dimensions", Value::Integer(768));

	expect_validation(payload, "must match storage.qdrant.vector_dim");
}

#[test]
fn mmr_lambda_must_be_in_unit_range() {
	let payload = sample_toml_with(&["rerank"], "mmr_lambda", Value::Float(1.5));

	expect_validation(payload, "rerank.mmr_lambda must be in the range 0.0-1.0.");
}

#[test]
fn blend_lambda_must_be_in_unit_range() {
	let payload = sample_toml_with(&["rerank"], "blend_lambda", Value::Float(-0.1));

	expect_validation(payload, "rerank.blend_lambda must be in the range 0.0-1.0.");
}

#[test]
fn learning_rate_must_be_positive() {
	let payload = sample_toml_with(&["rerank"], "learning_rate", Value::Float(0.0));

	expect_validation(payload, "rerank.learning_rate must be a finite number greater than zero.");
}

#[test]
fn retry_attempts_must_be_positive() {
	let payload = sample_toml_with(&["retrieval", "retry"], "max_attempts", Value::Integer(0));

	expect_validation(payload, "retrieval.retry.max_attempts must be greater than zero.");
}

#[test]
fn base_delay_must_not_exceed_cap() {
	let payload =
		sample_toml_with(&["retrieval", "retry"], "base_delay_ms", Value::Integer(20_000));

	expect_validation(payload, "must not exceed retrieval.retry.max_delay_ms");
}

#[test]
fn strict_sparse_requires_params_path() {
	let payload = sample_toml_with(&["providers", "sparse"], "strict", Value::Boolean(true));

	expect_validation(payload, "providers.sparse.params_path is required");
}

#[test]
fn unreadable_file_reports_read_error() {
	let path = env::temp_dir().join("savor_config_missing_file.toml");
	let err = savor_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}
