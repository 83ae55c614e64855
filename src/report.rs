//! Downloadable sustainability report rendered as Markdown

use chrono::NaiveDate;
use std::fmt::Write;
use thiserror::Error;

use crate::emissions::{aggregate, round2, AggregateEmissionResult, EmissionError, EmissionFactors, OperationalRecord};
use crate::insights::{EmissionAnalysis, Recommendations};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report requires {0}")]
    Incomplete(&'static str),
    #[error(transparent)]
    Emission(#[from] EmissionError),
}

#[derive(Debug, Clone)]
pub struct Report {
    generated_on: NaiveDate,
    records: Vec<OperationalRecord>,
    summary: AggregateEmissionResult,
    analysis: EmissionAnalysis,
    recommendations: Recommendations,
}

impl Report {
    pub fn build(
        records: &[OperationalRecord],
        analysis: Option<&EmissionAnalysis>,
        recommendations: Option<&Recommendations>,
        factors: &EmissionFactors,
        generated_on: NaiveDate,
    ) -> Result<Self, ReportError> {
        if records.is_empty() {
            return Err(ReportError::Incomplete("operational data"));
        }
        let analysis = analysis.ok_or(ReportError::Incomplete("an emission analysis"))?;
        let recommendations = recommendations.ok_or(ReportError::Incomplete("recommendations"))?;

        let mut records = records.to_vec();
        records.sort_by(OperationalRecord::cmp_by_date);
        let summary = aggregate(&records, factors)?;

        Ok(Self {
            generated_on,
            records,
            summary,
            analysis: analysis.clone(),
            recommendations: recommendations.clone(),
        })
    }

    pub fn file_name(&self) -> String {
        format!("EcoVision_Report_{}.md", self.generated_on.format("%Y-%m-%d"))
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        // Writing into a String never fails
        let _ = self.write_markdown(&mut out);
        out
    }

    fn write_markdown(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "# EcoVision Sustainability Report")?;
        writeln!(out)?;
        writeln!(out, "Generated on {}", self.generated_on.format("%Y-%m-%d"))?;
        writeln!(out)?;

        writeln!(out, "## 1. Executive Summary")?;
        writeln!(out)?;
        writeln!(out, "{}", self.analysis.overall_emission_summary)?;
        writeln!(out)?;
        writeln!(out, "{}", self.analysis.potential_savings_overview)?;
        writeln!(out)?;
        writeln!(out, "- Total emissions: {} kg CO2", round2(self.summary.total_emissions))?;
        writeln!(out, "- Average daily emissions: {} kg CO2", round2(self.summary.average_daily_emissions))?;
        writeln!(out, "- Emission intensity: {} kg CO2 per unit", round2(self.summary.emission_intensity))?;
        for entry in &self.summary.breakdown {
            writeln!(
                out,
                "- {}: {} kg CO2 ({}%)",
                entry.source.label(),
                round2(entry.emissions_kg),
                round2(entry.percentage_of_total)
            )?;
        }
        writeln!(out)?;

        writeln!(out, "## 2. Key Recommendations")?;
        writeln!(out)?;
        for (i, rec) in self.recommendations.recommendations.iter().enumerate() {
            writeln!(out, "{}. {}", i + 1, rec)?;
        }
        writeln!(out)?;

        writeln!(out, "## 3. AI-Identified Inefficiencies")?;
        writeln!(out)?;
        let sections = [
            ("Peak Usage", &self.analysis.peak_usage_insights),
            ("Idle Time", &self.analysis.idle_time_insights),
            ("Inefficiencies", &self.analysis.inefficiency_insights),
            ("Abnormal Energy Spikes", &self.analysis.abnormal_energy_spikes),
        ];
        for (title, body) in sections {
            writeln!(out, "### {}", title)?;
            writeln!(out)?;
            writeln!(out, "{}", body)?;
            writeln!(out)?;
        }

        writeln!(out, "## 4. Raw Operational Data")?;
        writeln!(out)?;
        writeln!(out, "| Date | Electricity (kWh) | Fuel Type | Fuel Amount | Production (units) |")?;
        writeln!(out, "|---|---|---|---|---|")?;
        for record in &self.records {
            let fuel_type = if record.fuel_type.source().is_some() {
                record.fuel_type.to_string()
            } else {
                "N/A".to_string()
            };
            let fuel_amount = record.fuel_display().unwrap_or_else(|| "-".to_string());
            writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                record.date, record.electricity_kwh, fuel_type, fuel_amount, record.production_units
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emissions::FuelType;

    fn record(date: &str, fuel_type: FuelType, fuel_amount: f64) -> OperationalRecord {
        OperationalRecord {
            id: date.to_string(),
            date: date.to_string(),
            electricity_kwh: 100.0,
            fuel_type,
            fuel_amount,
            production_units: 200.0,
            production_hours: 8.0,
            thermal_image_description: None,
            acoustic_analysis_summary: None,
        }
    }

    fn analysis() -> EmissionAnalysis {
        EmissionAnalysis {
            overall_emission_summary: "Emissions are dominated by diesel.".to_string(),
            peak_usage_insights: "Peaks on Mondays.".to_string(),
            idle_time_insights: "Idle lines overnight.".to_string(),
            inefficiency_insights: "Compressor leaks.".to_string(),
            abnormal_energy_spikes: "Spike on 2024-01-02.".to_string(),
            potential_savings_overview: "Up to 15% savings.".to_string(),
        }
    }

    fn recommendations() -> Recommendations {
        Recommendations {
            recommendations: vec!["Fix leaks.".to_string(), "Shift loads.".to_string()],
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    #[test]
    fn test_incomplete_inputs_rejected() {
        let records = vec![record("2024-01-01", FuelType::Diesel, 50.0)];
        let factors = EmissionFactors::default();

        let err = Report::build(&[], Some(&analysis()), Some(&recommendations()), &factors, today()).unwrap_err();
        assert!(matches!(err, ReportError::Incomplete(_)));
        let err = Report::build(&records, None, Some(&recommendations()), &factors, today()).unwrap_err();
        assert!(matches!(err, ReportError::Incomplete(_)));
        let err = Report::build(&records, Some(&analysis()), None, &factors, today()).unwrap_err();
        assert!(matches!(err, ReportError::Incomplete(_)));
    }

    #[test]
    fn test_markdown_sections() {
        let records = vec![
            record("2024-01-02", FuelType::None, 0.0),
            record("2024-01-01", FuelType::Diesel, 50.0),
        ];
        let report = Report::build(
            &records,
            Some(&analysis()),
            Some(&recommendations()),
            &EmissionFactors::default(),
            today(),
        )
        .unwrap();
        let md = report.render_markdown();

        assert!(md.contains("## 1. Executive Summary"));
        assert!(md.contains("## 2. Key Recommendations"));
        assert!(md.contains("## 3. AI-Identified Inefficiencies"));
        assert!(md.contains("## 4. Raw Operational Data"));
        assert!(md.contains("- Total emissions: 298 kg CO2"));
        assert!(md.contains("2. Shift loads."));
        assert!(md.contains("| 2024-01-01 | 100 | diesel | 50 L | 200 |"));
        assert!(md.contains("| 2024-01-02 | 100 | N/A | - | 200 |"));
        assert!(md.find("2024-01-01 |").unwrap() < md.find("2024-01-02 |").unwrap());
        assert_eq!(report.file_name(), "EcoVision_Report_2024-02-01.md");
    }
}
