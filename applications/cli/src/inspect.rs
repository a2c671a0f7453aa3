//! Catalog inspection

use crate::error::Result;
use loopweave_core::{Catalog, SectionKind};
use std::fmt::Write;

/// Human readable summary of a validated track
///
/// Lists every section reachable from the entry section with its entry
/// clip and transitions, then every clip of the clip set with its source
/// and successors. Successors outside the track are flagged.
pub fn describe_track(catalog: &Catalog, name: &str) -> Result<String> {
    let track = catalog.validate_track(name)?;
    let mut out = String::new();

    let _ = writeln!(out, "Track {} ({})", name, track.display_name_or(name));
    if let Some(base) = &track.base_path {
        let _ = writeln!(out, "  base path: {}", base.display());
    }
    let _ = writeln!(out, "  entry section: {}", track.entry_section);

    let _ = writeln!(out, "\nSections:");
    for section_name in catalog.reachable_sections(track) {
        let section = catalog.section(&section_name)?;
        let kind = match section.kind {
            SectionKind::Normal => "",
            SectionKind::Auto => " [auto]",
            SectionKind::Terminal => " [terminal]",
        };
        let _ = writeln!(
            out,
            "  {}{} enters {}",
            section.display_name_or(&section_name),
            kind,
            section.entry_clip
        );
        if !section.next_sections.is_empty() {
            let _ = writeln!(out, "    -> {}", section.next_sections.join(", "));
        }
    }

    let _ = writeln!(out, "\nClips:");
    for clip_name in &track.clip_set {
        let clip = catalog.clip(clip_name)?;
        let source = clip.source.resolve(None).unwrap_or("<no base source>");
        let _ = write!(out, "  {clip_name}: {source}");
        match clip.loop_point {
            Some(loop_point) => {
                let _ = write!(out, " loop {}..{}", clip.loop_start, loop_point);
            }
            None if clip.loop_start > 0.0 => {
                let _ = write!(out, " loop {}..end", clip.loop_start);
            }
            None => {}
        }
        let _ = writeln!(out);

        if clip.successors.is_empty() {
            continue;
        }
        let successors: Vec<String> = clip
            .successors
            .iter()
            .map(|s| {
                if track.contains_clip(s) {
                    s.clone()
                } else {
                    format!("{s} (missing)")
                }
            })
            .collect();
        let _ = writeln!(out, "    -> {}", successors.join(", "));
    }

    Ok(out)
}
