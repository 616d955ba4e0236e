//! Cell notes (legacy comments) from an OOXML package
//!
//! workbook.xml names each sheet and points at it through the workbook
//! relationships; each worksheet's own relationships point at its comments
//! part, whose `ref` attributes are A1 references.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use anyhow::{Context, Result};
use zip::ZipArchive;
use zip::result::ZipError;

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const COMMENTS_REL_SUFFIX: &str = "/comments";
/// Column `XFD`
const MAX_COLUMNS: u32 = 16_384;

/// Notes per sheet name, keyed by zero-based (row, col)
pub type SheetNotes = HashMap<String, HashMap<(u32, u32), String>>;

pub fn read_sheet_notes(bytes: &[u8]) -> Result<SheetNotes> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("Not a zip package")?;

    let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?
        .context("Package has no xl/workbook.xml")?;
    let workbook_rels = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
        Some(xml) => parse_relationships(&xml, "xl")?,
        None => return Ok(SheetNotes::new()),
    };

    let doc = roxmltree::Document::parse(&workbook_xml).context("Invalid workbook.xml")?;
    let mut notes = SheetNotes::new();

    for sheet in doc.descendants().filter(|n| n.has_tag_name("sheet")) {
        let (Some(name), Some(rel_id)) = (sheet.attribute("name"), sheet.attribute((REL_NS, "id")))
        else {
            continue;
        };
        let Some(rel) = workbook_rels.iter().find(|r| r.id == rel_id) else {
            continue;
        };

        let (dir, file) = split_part_path(&rel.target);
        let sheet_rels_path = format!("{}/_rels/{}.rels", dir, file);
        let Some(sheet_rels_xml) = read_part(&mut archive, &sheet_rels_path)? else {
            continue;
        };
        let sheet_rels = parse_relationships(&sheet_rels_xml, dir)?;

        for rel in sheet_rels.iter().filter(|r| r.rel_type.ends_with(COMMENTS_REL_SUFFIX)) {
            let Some(comments_xml) = read_part(&mut archive, &rel.target)? else {
                log::warn!("Sheet '{}' references missing part {}", name, rel.target);
                continue;
            };
            let parsed = parse_comments(&comments_xml)
                .with_context(|| format!("Invalid comments part {}", rel.target))?;
            if !parsed.is_empty() {
                notes.entry(name.to_string()).or_default().extend(parsed);
            }
        }
    }

    Ok(notes)
}

#[derive(Debug)]
struct Relationship {
    id: String,
    rel_type: String,
    /// Package path with the source directory already applied
    target: String,
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to open part {}", path)),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .with_context(|| format!("Failed to read part {}", path))?;
    Ok(Some(xml))
}

fn parse_relationships(xml: &str, base_dir: &str) -> Result<Vec<Relationship>> {
    let doc = roxmltree::Document::parse(xml).context("Invalid relationships part")?;
    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name("Relationship"))
        .filter(|n| n.attribute("TargetMode") != Some("External"))
        .filter_map(|n| {
            Some(Relationship {
                id: n.attribute("Id")?.to_string(),
                rel_type: n.attribute("Type")?.to_string(),
                target: resolve_target(base_dir, n.attribute("Target")?),
            })
        })
        .collect())
}

/// Resolve a relationship target against the directory of its source part
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in target.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn split_part_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", path),
    }
}

fn parse_comments(xml: &str) -> Result<HashMap<(u32, u32), String>> {
    let doc = roxmltree::Document::parse(xml)?;
    let mut out = HashMap::new();

    for comment in doc.descendants().filter(|n| n.has_tag_name("comment")) {
        let Some(pos) = comment.attribute("ref").and_then(parse_a1) else {
            continue;
        };
        // Phonetic runs (rPh) duplicate the visible text
        let text: String = comment
            .descendants()
            .filter(|n| n.has_tag_name("t"))
            .filter(|n| !n.ancestors().any(|a| a.has_tag_name("rPh")))
            .filter_map(|n| n.text())
            .collect();
        out.insert(pos, text);
    }

    Ok(out)
}

/// `B3` -> (2, 1)
fn parse_a1(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }

    let mut col: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    if col > MAX_COLUMNS {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_a1() {
        assert_eq!(parse_a1("A1"), Some((0, 0)));
        assert_eq!(parse_a1("B3"), Some((2, 1)));
        assert_eq!(parse_a1("$M$13"), Some((12, 12)));
        assert_eq!(parse_a1("AA10"), Some((9, 26)));
        assert_eq!(parse_a1("A0"), None);
        assert_eq!(parse_a1("12"), None);
        assert_eq!(parse_a1("XFD1"), Some((0, 16_383)));
        assert_eq!(parse_a1("XFE1"), None);
        assert_eq!(parse_a1("ZZZZZZZZZ1"), None);
        assert_eq!(parse_a1("A99999999999"), None);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl/worksheets", "../comments1.xml"), "xl/comments1.xml");
        assert_eq!(resolve_target("xl", "/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn test_parse_comments_concatenates_runs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <authors><author>ops</author></authors>
  <commentList>
    <comment ref="C5" authorId="0">
      <text><r><t xml:space="preserve">ops:</t></r><r><t xml:space="preserve">
출고 지연</t></r></text>
    </comment>
    <comment ref="A2" authorId="0"><text><t>plain</t><rPh sb="0" eb="1"><t>ignored</t></rPh></text></comment>
  </commentList>
</comments>"#;

        let comments = parse_comments(xml).unwrap();
        assert_eq!(comments.get(&(4, 2)).map(String::as_str), Some("ops:\n출고 지연"));
        assert_eq!(comments.get(&(1, 0)).map(String::as_str), Some("plain"));
    }
}
