use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Bot-wide game configuration (data/game.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub scoring: ScoringConfig,
    pub rating: RatingConfig,
    pub limits: LimitsConfig,

    /// Ranked entries per results page
    pub results_page_size: usize,

    /// Activity text shown in the bot's presence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
}

/// Score bands assigned when a round concludes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Number of score bands in a regular round
    pub quantile: usize,

    /// Score of the lowest band in a regular round
    pub base_score: i64,

    /// Round graded with the final-round bands, if any
    pub final_round: Option<u32>,

    pub final_quantile: usize,
    pub final_base_score: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            quantile: 6,
            base_score: 1,
            final_round: None,
            final_quantile: 3,
            final_base_score: 0,
        }
    }
}

impl ScoringConfig {
    /// (quantile, base score) used for `round`
    pub fn bands_for_round(&self, round: u32) -> (usize, i64) {
        if self.final_round == Some(round) {
            (self.final_quantile, self.final_base_score)
        } else {
            (self.quantile, self.base_score)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub initial_rating: f64,
    pub k_factor: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            initial_rating: 1000.0,
            k_factor: 50.0,
        }
    }
}

/// Maximum lengths of user supplied text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub response_max_len: usize,
    pub moniker_max_len: usize,
    pub prompt_max_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            response_max_len: 100,
            moniker_max_len: 32,
            prompt_max_len: 200,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            rating: RatingConfig::default(),
            limits: LimitsConfig::default(),
            results_page_size: 3,
            activity: None,
        }
    }
}

impl GameConfig {
    /// Load the config from a JSON file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BotError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        let config: GameConfig =
            serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
                path: path.to_string(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load the config, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !std::path::Path::new(path).exists() {
            tracing::warn!("Game config '{}' not found, using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scoring.quantile == 0 || self.scoring.final_quantile == 0 {
            return Err(BotError::ConfigValidation {
                message: "scoring quantiles must be greater than 0".to_string(),
            });
        }
        if self.results_page_size == 0 {
            return Err(BotError::ConfigValidation {
                message: "results_page_size must be greater than 0".to_string(),
            });
        }
        if self.rating.k_factor <= 0.0 {
            return Err(BotError::ConfigValidation {
                message: "rating.k_factor must be positive".to_string(),
            });
        }
        Ok(())
    }
}
