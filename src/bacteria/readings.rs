use super::incubation::Bacterium;
use crate::common::errors::BusinessResult;
use crate::samples::models::Model as SampleModel;
use crate::validation_error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The sample column a bacterium's reading is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MicroField {
    Enterobacteria,
    YeastMold,
    Coliforms,
    Staphylococcus,
    Listeria,
    EscherichiaColi,
    TotalFlora,
    Leuconostoc,
}

impl MicroField {
    pub fn for_bacterium(bacterium: Bacterium) -> Self {
        match bacterium {
            Bacterium::Enterobacteria => MicroField::Enterobacteria,
            Bacterium::EscherichiaColi => MicroField::EscherichiaColi,
            Bacterium::TotalColiforms => MicroField::Coliforms,
            Bacterium::Staphylococci => MicroField::Staphylococcus,
            Bacterium::Listeria => MicroField::Listeria,
            Bacterium::YeastMoldShort | Bacterium::YeastMoldLong => MicroField::YeastMold,
            Bacterium::TotalFlora => MicroField::TotalFlora,
            Bacterium::Leuconostoc => MicroField::Leuconostoc,
        }
    }

    pub fn column_name(self) -> &'static str {
        match self {
            MicroField::Enterobacteria => "enterobacteria",
            MicroField::YeastMold => "yeast_mold",
            MicroField::Coliforms => "coliforms_count",
            MicroField::Staphylococcus => "staphylococcus_count",
            MicroField::Listeria => "listeria_count",
            MicroField::EscherichiaColi => "escherichia_coli_count",
            MicroField::TotalFlora => "total_flora_count",
            MicroField::Leuconostoc => "leuconostoc_count",
        }
    }

    /// Entero and yeast/mold results are free text (`<10`, `absence`); the rest are counts
    pub fn is_count(self) -> bool {
        !matches!(self, MicroField::Enterobacteria | MicroField::YeastMold)
    }

    /// Current value rendered as text, `None` while unread
    pub fn read(self, sample: &SampleModel) -> Option<String> {
        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        match self {
            MicroField::Enterobacteria => text(&sample.enterobacteria),
            MicroField::YeastMold => text(&sample.yeast_mold),
            MicroField::Coliforms => sample.coliforms_count.map(|v| v.to_string()),
            MicroField::Staphylococcus => sample.staphylococcus_count.map(|v| v.to_string()),
            MicroField::Listeria => sample.listeria_count.map(|v| v.to_string()),
            MicroField::EscherichiaColi => sample.escherichia_coli_count.map(|v| v.to_string()),
            MicroField::TotalFlora => sample.total_flora_count.map(|v| v.to_string()),
            MicroField::Leuconostoc => sample.leuconostoc_count.map(|v| v.to_string()),
        }
    }

    pub fn is_filled(self, sample: &SampleModel) -> bool {
        self.read(sample).is_some()
    }
}

/// A parsed reading ready to be written to its column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MicroResult {
    Enterobacteria(String),
    YeastMold(String),
    Coliforms(i32),
    Staphylococcus(i32),
    Listeria(i32),
    EscherichiaColi(i32),
    TotalFlora(i32),
    Leuconostoc(i32),
}

impl MicroResult {
    /// Parse raw input for a field. Blank input yields `None` (nothing to record).
    pub fn parse(field: MicroField, raw: &str) -> BusinessResult<Option<Self>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        if !field.is_count() {
            let text = raw.to_string();
            return Ok(Some(match field {
                MicroField::Enterobacteria => MicroResult::Enterobacteria(text),
                _ => MicroResult::YeastMold(text),
            }));
        }

        let count: i32 = raw.parse().map_err(|_| {
            validation_error!(
                field.column_name(),
                format!("'{raw}' is not a whole colony count")
            )
        })?;
        if count < 0 {
            return Err(validation_error!(
                field.column_name(),
                "colony counts cannot be negative"
            ));
        }
        Ok(Some(match field {
            MicroField::Coliforms => MicroResult::Coliforms(count),
            MicroField::Staphylococcus => MicroResult::Staphylococcus(count),
            MicroField::Listeria => MicroResult::Listeria(count),
            MicroField::EscherichiaColi => MicroResult::EscherichiaColi(count),
            MicroField::TotalFlora => MicroResult::TotalFlora(count),
            _ => MicroResult::Leuconostoc(count),
        }))
    }

    pub fn apply_to(self, sample: &mut SampleModel) {
        match self {
            MicroResult::Enterobacteria(value) => sample.enterobacteria = Some(value),
            MicroResult::YeastMold(value) => sample.yeast_mold = Some(value),
            MicroResult::Coliforms(count) => sample.coliforms_count = Some(count),
            MicroResult::Staphylococcus(count) => sample.staphylococcus_count = Some(count),
            MicroResult::Listeria(count) => sample.listeria_count = Some(count),
            MicroResult::EscherichiaColi(count) => sample.escherichia_coli_count = Some(count),
            MicroResult::TotalFlora(count) => sample.total_flora_count = Some(count),
            MicroResult::Leuconostoc(count) => sample.leuconostoc_count = Some(count),
        }
    }
}
