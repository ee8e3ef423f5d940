// Application configuration
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub snapshot: SnapshotConfig,
    pub schema: SchemaConfig,
    pub accounts: AccountsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8090".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Local replica path.
    pub path: String,
    /// Opaque Google Drive file identifier of the upstream snapshot.
    pub drive_file_id: String,
    /// Age past which a re-fetch is mandatory even for a valid file.
    pub max_age_secs: u64,
    /// Period of the background refresh timer.
    pub refresh_interval_secs: u64,
    /// Bound on the download; a hung fetch must not run forever.
    pub fetch_timeout_secs: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: "dstechBD.db".to_string(),
            drive_file_id: "1vuJE0AxKhRrdt6gtKQnhp6pbviJvYt2H".to_string(),
            max_age_secs: 86_400,
            refresh_interval_secs: 86_400,
            fetch_timeout_secs: 120,
        }
    }
}

/// Table and column names of the snapshot, as data rather than hard-wired
/// literals. Defaults match the upstream vendor schema. The upstream table has
/// no client column; the production line stands in for it.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchemaConfig {
    pub table: String,
    pub timestamp: String,
    pub machine: String,
    pub client: String,
    pub pieces_in: String,
    pub pieces_out: String,
    pub efficiency_in: String,
    pub efficiency_out: String,
    pub operating_time: String,
    pub idle_time: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            table: "DADOS".to_string(),
            timestamp: "DATA".to_string(),
            machine: "MAQUINA".to_string(),
            client: "LINHA".to_string(),
            pieces_in: "PECAS_TOT_ENT".to_string(),
            pieces_out: "PECAS_TOT_SAI".to_string(),
            efficiency_in: "EF_ENTRADA".to_string(),
            efficiency_out: "EF_SAIDA".to_string(),
            operating_time: "TEMPO_MAQ_LIGADA".to_string(),
            idle_time: "TEMPO_MAQ_PARADA".to_string(),
        }
    }
}

impl SchemaConfig {
    /// Column names in stored order, used as preview table headers.
    pub fn column_order(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.machine.clone(),
            self.client.clone(),
            self.pieces_in.clone(),
            self.pieces_out.clone(),
            self.efficiency_in.clone(),
            self.efficiency_out.clone(),
            self.operating_time.clone(),
            self.idle_time.clone(),
        ]
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AccountsConfig {
    pub path: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            path: "users.json".to_string(),
        }
    }
}

/// Load from `config/dashboard.toml` when present, falling back to coded
/// defaults. `DASHBOARD_*` environment variables override file values.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
