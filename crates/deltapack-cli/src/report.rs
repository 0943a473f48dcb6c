//! Text rendering of previews and package summaries.

use deltapack_core::{PackageSummary, PreviewReport};

pub fn render_preview_text(report: &PreviewReport) -> String {
    format!(
        "Preview\n=======\nchanges: {}\nstatic files: {}\ncompiled files: {}\nignored: {}",
        report.total_changes,
        report.static_files,
        report.compiled_files,
        report.unclassified()
    )
}

pub fn render_summary_text(summary: &PackageSummary) -> String {
    let mut out = String::new();
    out.push_str("Package Summary\n");
    out.push_str("===============\n");
    out.push_str(&format!("package: {}\n", summary.package_folder.display()));
    out.push_str(&format!("changes: {}\n", summary.total_changes));
    out.push_str(&format!("static files copied: {}\n", summary.static_files_copied));
    out.push_str(&format!(
        "units built: {}/{}\n",
        summary.units_built, summary.units_attempted
    ));

    if let Some(archive) = &summary.archive_path {
        out.push_str(&format!("archive: {}\n", archive.display()));
    }
    if let Some(digest) = &summary.archive_sha256 {
        out.push_str(&format!("sha256: {}\n", digest));
    }

    if !summary.failures.is_empty() {
        out.push_str("\nNot packaged:\n");
        for failure in &summary.failures {
            out.push_str(&format!("  - {}: {}\n", failure.unit, failure.reason));
        }
    }

    out.trim_end().to_string()
}
