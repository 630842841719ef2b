use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_HUGGINGFACE_API_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-mpnet-base-v2";
const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
const DEFAULT_GENERATION_MODEL: &str = "HuggingFaceH4/zephyr-7b-beta";
const DEFAULT_CHUNK_SIZE: usize = 4000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_TOP_K: usize = 4;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the pdfchat server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server listens on.
    pub server_port: u16,
    /// Response returned to POST requests with an unrecognized content type.
    pub unsupported_content_type: FallbackResponse,
    /// Vector store backend and its connection details.
    pub vector_store: VectorStoreConfig,
    /// Embedding provider shared by ingestion and retrieval.
    pub embedding: EmbeddingSettings,
    /// Text-generation provider used to answer questions.
    pub generation: GenerationSettings,
    /// How the question-answering pipeline renders its result.
    pub answer_mode: AnswerMode,
    /// Trim surrounding whitespace from generated answers.
    pub trim_answer: bool,
    /// Character budget and overlap used when splitting pages.
    pub chunking: ChunkingSettings,
    /// Number of nearest neighbours retrieved per question.
    pub retrieval_top_k: usize,
    /// Optional per-request timeout applied to every outbound provider call.
    pub provider_timeout_secs: Option<u64>,
}

/// Fallback behavior for POST requests that are neither multipart nor JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackResponse {
    /// Reply `200 Hello World.`.
    #[default]
    Greeting,
    /// Reply `400 Unsupported content type`.
    Reject,
}

/// Shape of the answer returned by the question-answering pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    /// Feed retrieved chunks to the text-generation model and return its answer.
    #[default]
    Generate,
    /// Return the ranked matches from the vector store without generation.
    Matches,
}

/// Supported vector store backends.
#[derive(Debug, Clone)]
pub enum VectorStoreConfig {
    /// Managed Pinecone index accessed over its REST API.
    Pinecone(PineconeSettings),
    /// Qdrant collection accessed over its HTTP API.
    Qdrant(QdrantSettings),
}

impl VectorStoreConfig {
    /// Name of the index or collection receiving document chunks.
    pub fn collection_name(&self) -> &str {
        match self {
            Self::Pinecone(settings) => &settings.index_name,
            Self::Qdrant(settings) => &settings.collection_name,
        }
    }
}

/// Connection details for a Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeSettings {
    /// API key sent in the `Api-Key` header.
    pub api_key: String,
    /// Index name.
    pub index_name: String,
    /// Legacy environment/region (e.g. `gcp-starter`), used to locate the controller.
    pub environment: Option<String>,
    /// Explicit data-plane host; skips control-plane lookup when set.
    pub host: Option<String>,
    /// Override for the control-plane base URL.
    pub controller_url: Option<String>,
    /// Optional namespace inside the index.
    pub namespace: Option<String>,
}

/// Connection details for a Qdrant collection.
#[derive(Debug, Clone)]
pub struct QdrantSettings {
    /// Base URL of the Qdrant instance.
    pub url: String,
    /// Collection storing the document chunks.
    pub collection_name: String,
    /// Optional API key required to access Qdrant.
    pub api_key: Option<String>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Hugging Face Inference API feature-extraction pipeline.
    HuggingFace,
    /// Hosted OpenAI embeddings API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

/// Embedding provider settings.
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    /// Backend producing the vectors.
    pub provider: EmbeddingProvider,
    /// Model identifier passed to the provider.
    pub model: String,
    /// Dimensionality every produced vector must have.
    pub dimension: usize,
    /// Base URL of the provider API.
    pub api_url: String,
    /// Credential for the provider, when it needs one.
    pub api_key: Option<String>,
}

/// Supported text-generation backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Hugging Face Inference API text-generation task.
    HuggingFace,
    /// Local Ollama runtime.
    Ollama,
}

/// Text-generation provider settings and fixed sampling parameters.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Backend generating the answers.
    pub provider: GenerationProvider,
    /// Repository id or model name.
    pub model: String,
    /// Base URL of the provider API.
    pub api_url: String,
    /// Credential for the provider, when it needs one.
    pub api_key: Option<String>,
    /// Upper bound on generated tokens.
    pub max_new_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Repetition penalty.
    pub repetition_penalty: f64,
}

/// Chunking constants applied to every ingested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingSettings {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let huggingface_token = load_env_optional("HUGGINGFACEHUB_API_TOKEN");
        let huggingface_url = load_env_optional("HUGGINGFACE_API_URL")
            .unwrap_or_else(|| DEFAULT_HUGGINGFACE_API_URL.to_string());
        let ollama_url =
            load_env_optional("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        let vector_store = match load_env_optional("VECTOR_STORE_PROVIDER")
            .as_deref()
            .unwrap_or("pinecone")
            .to_lowercase()
            .as_str()
        {
            "pinecone" => VectorStoreConfig::Pinecone(PineconeSettings {
                api_key: load_env("PINECONE_API_KEY")?,
                index_name: load_env("PINECONE_INDEX")?,
                environment: load_env_optional("PINECONE_ENV"),
                host: load_env_optional("PINECONE_HOST"),
                controller_url: load_env_optional("PINECONE_CONTROLLER_URL"),
                namespace: load_env_optional("PINECONE_NAMESPACE"),
            }),
            "qdrant" => VectorStoreConfig::Qdrant(QdrantSettings {
                url: load_env("QDRANT_URL")?,
                collection_name: load_env("QDRANT_COLLECTION_NAME")?,
                api_key: load_env_optional("QDRANT_API_KEY"),
            }),
            _ => return Err(ConfigError::InvalidValue("VECTOR_STORE_PROVIDER".into())),
        };

        let embedding_provider: EmbeddingProvider = parse_env_or(
            "EMBEDDING_PROVIDER",
            EmbeddingProvider::HuggingFace,
        )?;
        let (embedding_url, embedding_key) = match embedding_provider {
            EmbeddingProvider::HuggingFace => (
                huggingface_url.clone(),
                Some(require(huggingface_token.clone(), "HUGGINGFACEHUB_API_TOKEN")?),
            ),
            EmbeddingProvider::OpenAI => (
                load_env_optional("OPENAI_API_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string()),
                Some(load_env("OPENAI_API_KEY")?),
            ),
            EmbeddingProvider::Ollama => (ollama_url.clone(), None),
        };
        let embedding = EmbeddingSettings {
            provider: embedding_provider,
            model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            dimension: parse_env_or("EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?,
            api_url: embedding_url,
            api_key: embedding_key,
        };
        if embedding.dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }

        let generation_provider: GenerationProvider =
            parse_env_or("GENERATION_PROVIDER", GenerationProvider::HuggingFace)?;
        let (generation_url, generation_key) = match generation_provider {
            GenerationProvider::HuggingFace => (
                huggingface_url,
                Some(require(huggingface_token, "HUGGINGFACEHUB_API_TOKEN")?),
            ),
            GenerationProvider::Ollama => (ollama_url, None),
        };
        let generation = GenerationSettings {
            provider: generation_provider,
            model: load_env_optional("GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            api_url: generation_url,
            api_key: generation_key,
            max_new_tokens: parse_env_or("GENERATION_MAX_NEW_TOKENS", 512)?,
            temperature: parse_env_or("GENERATION_TEMPERATURE", 0.5)?,
            top_k: parse_env_or("GENERATION_TOP_K", 30)?,
            repetition_penalty: parse_env_or("GENERATION_REPETITION_PENALTY", 1.03)?,
        };

        let chunking = ChunkingSettings {
            chunk_size: parse_env_or("TEXT_SPLITTER_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: parse_env_or("TEXT_SPLITTER_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
        };
        if chunking.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("TEXT_SPLITTER_CHUNK_SIZE".into()));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_OVERLAP".into(),
            ));
        }

        let retrieval_top_k = parse_env_or("RETRIEVAL_TOP_K", DEFAULT_TOP_K)?;
        if retrieval_top_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVAL_TOP_K".into()));
        }

        Ok(Self {
            server_port: parse_env_or("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            unsupported_content_type: parse_env_or(
                "UNSUPPORTED_CONTENT_TYPE_RESPONSE",
                FallbackResponse::Greeting,
            )?,
            vector_store,
            embedding,
            generation,
            answer_mode: parse_env_or("ANSWER_MODE", AnswerMode::Generate)?,
            trim_answer: parse_env_or("ANSWER_TRIM", true)?,
            chunking,
            retrieval_top_k,
            provider_timeout_secs: load_env_optional("PROVIDER_TIMEOUT_SECS")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("PROVIDER_TIMEOUT_SECS".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    require(load_env_optional(key), key)
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn require(value: Option<String>, key: &str) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn parse_env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl FromStr for AnswerMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generate" => Ok(Self::Generate),
            "matches" => Ok(Self::Matches),
            _ => Err(()),
        }
    }
}

impl FromStr for FallbackResponse {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "greeting" => Ok(Self::Greeting),
            "reject" => Ok(Self::Reject),
            _ => Err(()),
        }
    }
}

/// Load configuration from the environment (and `.env`).
pub fn init_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        collection = %config.vector_store.collection_name(),
        server_port = config.server_port,
        embedding_provider = ?config.embedding.provider,
        embedding_model = %config.embedding.model,
        generation_provider = ?config.generation.provider,
        answer_mode = ?config.answer_mode,
        "Loaded configuration"
    );
    Ok(config)
}
