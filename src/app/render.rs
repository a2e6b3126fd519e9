use crate::domain::model::{IdentificationReport, RankedResult};
use crate::utils::error::Result;
use std::fmt::Write;

pub fn render_json(report: &IdentificationReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_text(report: &IdentificationReport) -> String {
    let mut out = String::new();
    // write! 到 String 不會失敗
    let _ = writeln!(out, "Identification Results");
    let _ = writeln!(
        out,
        "Location: {} | last {} days, same month over {} years",
        report.region, report.window.days_back, report.window.years_back
    );
    let _ = writeln!(out);

    if report.no_observations {
        let _ = writeln!(
            out,
            "⚠️  No observations found for these species in your location and time period.\n\
             Results are ranked by description match only.\n\n\
             This could mean:\n\
             - The birds are rare in this area\n\
             - The time period selected has no observations\n\
             - The species names may need adjustment\n"
        );
        let _ = writeln!(out, "Suggested Species (by Description Match):");
        for (i, result) in report.results.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, title(result));
            if let Some(url) = result.ebird_url() {
                let _ = writeln!(out, "   {}", url);
            }
        }
    } else {
        for (i, result) in report.results.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, title(result));
            let _ = writeln!(
                out,
                "   Probability: {:.1}% ({} observations)  Combined Score: {:.1}",
                result.probability * 100.0,
                result.observation_count,
                result.combined_score
            );
            let _ = writeln!(
                out,
                "   LLM Rank: {}  Weights Used: LLM={:.2}, eBird={:.2}",
                result.candidate.llm_rank,
                report.llm_weight,
                1.0 - report.llm_weight
            );
            if let Some(url) = result.ebird_url() {
                let _ = writeln!(out, "   eBird Page: {}", url);
            }
            let _ = writeln!(out, "   {}", bar(result.probability));
        }
    }

    let _ = writeln!(out);
    let _ = write!(out, "🤖 Model used: {}", report.model_used);
    out
}

fn title(result: &RankedResult) -> String {
    match &result.candidate.scientific_name {
        Some(scientific) => format!("{} ({})", result.candidate.common_name, scientific),
        None => result.candidate.common_name.clone(),
    }
}

fn bar(probability: f64) -> String {
    const WIDTH: usize = 20;
    let filled = ((probability.clamp(0.0, 1.0) * WIDTH as f64).round()) as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(WIDTH - filled))
}
