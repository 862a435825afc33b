// src/config/pipeline.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::analyze::ModelSettings;
use crate::ingest::types::{default_user_agent, SourceDescriptor};
use crate::pipeline::DEFAULT_MAX_HEADLINES;
use crate::signal::{Mode, DEFAULT_MIN_CONFIDENCE};

pub const ENV_CONFIG_PATH: &str = "SIGNALS_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

const ENV_MODE: &str = "SIGNALS_MODE";
const ENV_MODEL_BASE_URL: &str = "MODEL_BASE_URL";
const ENV_MODEL_NAME: &str = "MODEL_NAME";
const ENV_MIN_CONFIDENCE: &str = "SIGNALS_MIN_CONFIDENCE";

/// Canned headlines for demo mode.
pub const SAMPLE_HEADLINES: [&str; 15] = [
    "Reliance Industries reports 15% jump in quarterly profits driven by retail expansion",
    "TCS announces major cloud computing deal worth $2.5 billion with European client",
    "HDFC Bank faces regulatory scrutiny over digital lending practices",
    "Infosys stock surges after raising full-year revenue guidance",
    "Adani Group stocks tumble amid fresh concerns over debt levels",
    "ITC shares gain on strong cigarette volume growth in Q3",
    "Bajaj Finance reports higher bad loan provisions, stock falls",
    "Wipro wins multi-year IT services contract from Fortune 500 company",
    "Maruti Suzuki cuts production due to semiconductor shortage",
    "SBI reports record quarterly profits, announces dividend increase",
    "Bharti Airtel subscriber base grows, ARPU shows improvement",
    "Coal India production drops 8% in December, shares decline",
    "Tata Motors electric vehicle sales cross 50,000 units milestone",
    "ONGC discovers new oil reserves in Krishna Godavari basin",
    "Asian Paints faces margin pressure from raw material cost inflation",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    pub headlines: Vec<String>,
    pub sample_min: usize,
    pub sample_max: usize,
    pub seed: Option<u64>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            headlines: SAMPLE_HEADLINES.iter().map(|s| s.to_string()).collect(),
            sample_min: 8,
            sample_max: 12,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeuristicConfig {
    /// External keyword tables (JSON). Embedded tables when unset.
    pub keywords_path: Option<PathBuf>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: Mode,
    /// In production, start in demo mode when the model backend cannot be reached.
    pub fallback_to_demo: bool,
    pub min_confidence: u8,
    pub max_headlines: usize,
    pub model: ModelSettings,
    pub sources: Vec<SourceDescriptor>,
    pub demo: DemoConfig,
    pub heuristic: HeuristicConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Production,
            fallback_to_demo: true,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_headlines: DEFAULT_MAX_HEADLINES,
            model: ModelSettings::default(),
            sources: default_sources(),
            demo: DemoConfig::default(),
            heuristic: HeuristicConfig::default(),
        }
    }
}

/// The two production sources used when no config file is present.
pub fn default_sources() -> Vec<SourceDescriptor> {
    let strs = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    vec![
        SourceDescriptor {
            name: "moneycontrol".into(),
            url: "https://www.moneycontrol.com/news/business/stocks/".into(),
            user_agent: default_user_agent(),
            timeout_secs: 10,
            selectors: strs(&[
                "h2 a",
                "h3 a",
                ".news_title a",
                ".title a",
                "a[href*=\"/news/\"]",
                ".headline a",
            ]),
            min_length: 20,
            keywords: strs(&[
                "stock", "share", "company", "profit", "revenue", "quarter", "earnings",
            ]),
            scan_limit: 15,
            max_headlines: 10,
        },
        SourceDescriptor {
            name: "financialexpress".into(),
            url: "https://www.financialexpress.com/market/".into(),
            user_agent: default_user_agent(),
            timeout_secs: 10,
            selectors: strs(&["h2 a", "h3 a", ".story-title a", ".title a"]),
            min_length: 20,
            keywords: Vec::new(),
            scan_limit: 10,
            max_headlines: 10,
        },
    ]
}

impl PipelineConfig {
    /// Parse a TOML file, then apply env overrides and sanitize.
    pub fn load_from(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let cfg: PipelineConfig = toml::from_str(&data)
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;
        cfg.finish()
    }

    /// Load using env var + fallbacks:
    /// 1) $SIGNALS_CONFIG_PATH
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        PipelineConfig::default().finish()
    }

    fn finish(mut self) -> Result<Self> {
        self.apply_env_overrides()?;
        self.sanitize();
        Ok(self)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_nonempty(ENV_MODE) {
            self.mode = v
                .parse()
                .with_context(|| format!("invalid {ENV_MODE}"))?;
        }
        if let Some(v) = env_nonempty(ENV_MODEL_BASE_URL) {
            self.model.base_url = v;
        }
        if let Some(v) = env_nonempty(ENV_MODEL_NAME) {
            self.model.model = v;
        }
        if let Some(v) = env_nonempty(ENV_MIN_CONFIDENCE) {
            let n: u32 = v
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_MIN_CONFIDENCE}"))?;
            self.min_confidence = n.min(100) as u8;
        }
        Ok(())
    }

    /// Repair out-of-range values instead of failing startup.
    pub fn sanitize(&mut self) {
        if self.min_confidence > 100 {
            self.min_confidence = 100;
        }
        if self.max_headlines == 0 {
            self.max_headlines = DEFAULT_MAX_HEADLINES;
        }
        if self.demo.sample_min > self.demo.sample_max {
            // swap to keep a valid interval
            std::mem::swap(&mut self.demo.sample_min, &mut self.demo.sample_max);
        }

        self.sources.retain(|s| {
            let keep = !s.selectors.is_empty();
            if !keep {
                warn!(target: "config", source = %s.name, "source has no selectors; dropped");
            }
            keep
        });

        if let Some(slowest) = self.sources.iter().map(|s| s.timeout_secs).max() {
            if self.model.timeout_secs <= slowest {
                let raised = slowest.saturating_mul(2).max(slowest + 1);
                warn!(
                    target: "config",
                    configured = self.model.timeout_secs,
                    raised,
                    "model timeout must exceed source timeouts; raised"
                );
                self.model.timeout_secs = raised;
            }
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    fn clear_env() {
        for k in [
            ENV_CONFIG_PATH,
            ENV_MODE,
            ENV_MODEL_BASE_URL,
            ENV_MODEL_NAME,
            ENV_MIN_CONFIDENCE,
        ] {
            env::remove_var(k);
        }
    }

    #[test]
    fn defaults_match_production_setup() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.mode, Mode::Production);
        assert_eq!(cfg.min_confidence, 50);
        assert_eq!(cfg.max_headlines, 15);
        assert_eq!(cfg.model.timeout_secs, 30);
        assert_eq!(cfg.sources.len(), 2);
        assert!(cfg.sources.iter().all(|s| s.timeout_secs < cfg.model.timeout_secs));
        assert_eq!(cfg.demo.headlines.len(), 15);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: PipelineConfig = toml::from_str(
            r#"
            mode = "demo"
            min_confidence = 65

            [model]
            model = "llama3"

            [[sources]]
            name = "pulse"
            url = "https://pulse.zerodha.com/"
            selectors = [".post-title", "h2"]
            min_length = 15
            "#,
        )
        .unwrap();
        assert_eq!(cfg.mode, Mode::Demo);
        assert_eq!(cfg.min_confidence, 65);
        assert_eq!(cfg.model.model, "llama3");
        assert_eq!(cfg.model.base_url, "http://localhost:11434");
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sources[0].timeout_secs, 10);
        assert_eq!(cfg.sources[0].min_length, 15);
        assert!(cfg.sources[0].keywords.is_empty());
        assert_eq!(cfg.demo.sample_max, 12);
    }

    #[test]
    fn sanitize_repairs_bad_values() {
        let mut cfg = PipelineConfig {
            min_confidence: 180,
            max_headlines: 0,
            ..PipelineConfig::default()
        };
        cfg.demo.sample_min = 12;
        cfg.demo.sample_max = 8;
        cfg.model.timeout_secs = 5;
        cfg.sources[0].timeout_secs = 20;
        cfg.sources[1].selectors.clear();

        cfg.sanitize();
        assert_eq!(cfg.min_confidence, 100);
        assert_eq!(cfg.max_headlines, 15);
        assert_eq!((cfg.demo.sample_min, cfg.demo.sample_max), (8, 12));
        assert_eq!(cfg.sources.len(), 1);
        assert!(cfg.model.timeout_secs > 20);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        clear_env();

        // no files in temp CWD → built-in defaults
        let cfg = PipelineConfig::load_default().unwrap();
        assert_eq!(cfg, {
            let mut d = PipelineConfig::default();
            d.sanitize();
            d
        });

        // config/pipeline.toml in CWD is picked up
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join(DEFAULT_CONFIG_PATH), "min_confidence = 70\n").unwrap();
        assert_eq!(PipelineConfig::load_default().unwrap().min_confidence, 70);

        // env path wins
        let p = tmp.path().join("other.toml");
        fs::write(&p, "mode = \"demo\"\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        assert_eq!(PipelineConfig::load_default().unwrap().mode, Mode::Demo);

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(PipelineConfig::load_default().is_err());

        clear_env();
        env::set_current_dir(&old).unwrap();
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_apply() {
        clear_env();
        env::set_var(ENV_MODE, "Demo");
        env::set_var(ENV_MODEL_BASE_URL, "http://127.0.0.1:9999");
        env::set_var(ENV_MIN_CONFIDENCE, "250");
        let mut cfg = PipelineConfig::default();
        cfg.apply_env_overrides().unwrap();
        assert_eq!(cfg.mode, Mode::Demo);
        assert_eq!(cfg.model.base_url, "http://127.0.0.1:9999");
        assert_eq!(cfg.min_confidence, 100);

        env::set_var(ENV_MODE, "sideways");
        assert!(cfg.apply_env_overrides().is_err());
        clear_env();
    }
}
