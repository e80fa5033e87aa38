use super::*;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.model, "nomic-embed-text:latest");
    assert_eq!(config.ollama.embedding_dimension, 768);
    assert_eq!(config.generator.model, "mistral:7b");
    assert_eq!(config.index.dimension, 768);
    assert_eq!(config.index.m, 32);
    assert_eq!(config.index.ef_construction, 200);
    assert_eq!(config.index.ef_search, 50);
    assert!(config.validate().is_ok());
}

#[test]
fn ollama_validation() {
    let mut config = Config::default();
    config.ollama.port = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.ollama.model = String::new();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.ollama.batch_size = 1001;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.ollama.protocol = "ftp".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn index_validation() {
    let mut config = Config::default();
    config.index.m = 2;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidConnectivity(2))
    ));

    let mut config = Config::default();
    config.index.ef_construction = 8;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidEfConstruction(8, 32))
    ));

    let mut config = Config::default();
    config.index.ef_search = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidEfSearch(0))
    ));
}

#[test]
fn embedding_dimension_must_match_index() {
    let mut config = Config::default();
    config.ollama.embedding_dimension = 384;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::EmbeddingDimensionMismatch(384, 768))
    ));
}

#[test]
fn chunking_validation() {
    let mut config = Config::default();
    config.chunking.window_overlap = 600;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidWindowOverlap(600, 600))
    ));

    let mut config = Config::default();
    config.chunking.chunk_overlap = 2000;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.chunking.min_chunk_size = 5000;
    assert!(config.validate().is_err());
}

#[test]
fn generator_validation() {
    let mut config = Config::default();
    config.generator.max_tokens = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.generator.temperature = 3.0;
    assert!(config.validate().is_err());
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_round_trip() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let parsed: Config = toml::from_str("[ollama]\nhost = \"remote\"\n")
        .expect("should parse partial toml");
    assert_eq!(parsed.ollama.host, "remote");
    assert_eq!(parsed.ollama.port, 11434);
    assert_eq!(parsed.index.m, 32);
    assert_eq!(parsed.chunking.window_size, 600);
}
