use crate::utils::error::{ComplianceError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "ingredient-compliance")]
#[command(about = "Check label ingredients against GRAS, NDI and major allergen reference data")]
pub struct CliConfig {
    #[arg(long, short = 'c', default_value = "compliance.toml")]
    pub config: String,

    /// 可重複指定，例如 -i "Whey Protein Isolate" -i Sugar
    #[arg(long = "ingredient", short = 'i')]
    pub ingredients: Vec<String>,

    /// 每行一個成分的文字檔
    #[arg(long)]
    pub ingredients_file: Option<String>,

    #[arg(long, help = "Allergen statement printed on the label, e.g. \"Contains: Milk, Soy\"")]
    pub allergen_statement: Option<String>,

    #[arg(long, help = "Load every reference dataset before checking")]
    pub warm_up: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 合併命令列與檔案中的成分，保留原順序並略過空白行
    pub fn collect_ingredients(&self) -> Result<Vec<String>> {
        let mut ingredients: Vec<String> = self
            .ingredients
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        if let Some(path) = &self.ingredients_file {
            let content = std::fs::read_to_string(Path::new(path))?;
            ingredients.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(String::from),
            );
        }

        if ingredients.is_empty() {
            return Err(ComplianceError::MissingConfigError {
                field: "ingredient".to_string(),
            });
        }
        Ok(ingredients)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("config", &self.config)?;
        if let Some(path) = &self.ingredients_file {
            validation::validate_path("ingredients_file", path)?;
        }
        Ok(())
    }
}
