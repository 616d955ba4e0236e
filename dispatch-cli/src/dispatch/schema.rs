//! Canonical columns of the integrated view and their source header aliases
//!
//! Alias lists are in priority order: the first alias found among the source
//! headers wins. Several columns deliberately mean different things per
//! partner ("고객사" is the customer for glovis, "국가" the destination country
//! for mobis) and share one canonical slot.

use super::SchemaType;

/// One column of the integrated view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalColumn {
    pub name: &'static str,
    pub glovis: &'static [&'static str],
    pub mobis: &'static [&'static str],
}

impl CanonicalColumn {
    pub fn aliases(&self, schema_type: SchemaType) -> &'static [&'static str] {
        match schema_type {
            SchemaType::Glovis => self.glovis,
            SchemaType::Mobis => self.mobis,
        }
    }
}

const fn same(name: &'static str, aliases: &'static [&'static str]) -> CanonicalColumn {
    CanonicalColumn {
        name,
        glovis: aliases,
        mobis: aliases,
    }
}

pub const CANONICAL_COLUMNS: &[CanonicalColumn] = &[
    same("구분", &["구분"]),
    same("화주", &["화주"]),
    same("담당자", &["담당자", "당당자"]),
    same("작업지", &["작업지"]),
    CanonicalColumn {
        name: "고객사(국가)",
        glovis: &["고객사"],
        mobis: &["국가"],
    },
    CanonicalColumn {
        name: "포트(도착항)",
        glovis: &["포트"],
        mobis: &["도착항"],
    },
    CanonicalColumn {
        name: "특이사항(Nomi,구간)",
        glovis: &["특이사항"],
        mobis: &["Nomi,구간", "특이사항"],
    },
    CanonicalColumn {
        name: "라인(선사명)",
        glovis: &["라인", "선사"],
        mobis: &["선사명", "선사"],
    },
    same("TYPE", &["TYPE", "T"]),
    same("배차정보", &["배차정보"]),
    CanonicalColumn {
        name: "오더(계)",
        glovis: &["오더"],
        mobis: &["계", "수량"],
    },
    same("배차예정", &["배차예정"]),
    same("기타", &["기타/철송", "기타"]),
    same("아산", &["아산"]),
    same("부산", &["부산", "신항"]),
    same("광양", &["광양"]),
    same("평택", &["평택"]),
    same("중부", &["중부"]),
    same("부곡", &["부곡"]),
    same("인천", &["인천"]),
    same("배차", &["배차"]),
    same("검증", &["검증"]),
    same("비고", &["비고"]),
];

/// Header list of the integrated view
pub fn canonical_headers() -> Vec<String> {
    CANONICAL_COLUMNS.iter().map(|c| c.name.to_string()).collect()
}

fn find_alias(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h.trim() == *alias))
}

/// Source column index for a canonical column, by name
///
/// `None` when the canonical name is unknown or no alias is present.
pub fn resolve_column(headers: &[String], canonical: &str, schema_type: SchemaType) -> Option<usize> {
    let column = CANONICAL_COLUMNS.iter().find(|c| c.name == canonical)?;
    find_alias(headers, column.aliases(schema_type))
}

/// Canonical -> source column indices for one snapshot's headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    sources: Vec<Option<usize>>,
}

impl ColumnMapping {
    pub fn new(headers: &[String], schema_type: SchemaType) -> Self {
        let sources = CANONICAL_COLUMNS
            .iter()
            .map(|column| {
                let aliases = column.aliases(schema_type);
                let found = find_alias(headers, aliases);
                log_ambiguity(headers, column, aliases, found, schema_type);
                found
            })
            .collect();
        Self { sources }
    }

    /// Source index for the canonical column at `canonical_index`
    pub fn source_of(&self, canonical_index: usize) -> Option<usize> {
        self.sources.get(canonical_index).copied().flatten()
    }

    /// First canonical column fed by the given source column
    pub fn canonical_index_of(&self, source_col: usize) -> Option<usize> {
        self.sources.iter().position(|s| *s == Some(source_col))
    }

    /// Project a source row onto the canonical columns
    pub fn project_row(&self, row: &[String]) -> Vec<String> {
        self.sources
            .iter()
            .map(|source| {
                source
                    .and_then(|idx| row.get(idx))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Note when more than one source column could feed the same canonical column
fn log_ambiguity(
    headers: &[String],
    column: &CanonicalColumn,
    aliases: &[&str],
    chosen: Option<usize>,
    schema_type: SchemaType,
) {
    let Some(chosen) = chosen else {
        log::debug!("{}: no source column for '{}'", schema_type, column.name);
        return;
    };
    let matches: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| aliases.contains(&h.trim()))
        .map(|(i, _)| i)
        .collect();
    if matches.len() > 1 {
        log::debug!(
            "{}: '{}' matches source columns {:?}, using {}",
            schema_type,
            column.name,
            matches,
            chosen
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_canonical_headers_order() {
        let names = canonical_headers();
        assert_eq!(names.len(), 23);
        assert_eq!(names.first().map(String::as_str), Some("구분"));
        assert_eq!(names[10], "오더(계)");
        assert_eq!(names.last().map(String::as_str), Some("비고"));
    }

    #[test]
    fn test_resolve_uses_schema_specific_aliases() {
        let glovis = headers(&["구분", "고객사", "오더"]);
        let mobis = headers(&["구분", "국가", "수량"]);

        assert_eq!(resolve_column(&glovis, "고객사(국가)", SchemaType::Glovis), Some(1));
        assert_eq!(resolve_column(&mobis, "고객사(국가)", SchemaType::Mobis), Some(1));
        // "국가" is not a glovis alias
        assert_eq!(resolve_column(&mobis, "고객사(국가)", SchemaType::Glovis), None);
        assert_eq!(resolve_column(&mobis, "오더(계)", SchemaType::Mobis), Some(2));
    }

    #[test]
    fn test_first_alias_wins_over_earlier_column() {
        // "선사" appears first but "선사명" is the higher priority mobis alias
        let mobis = headers(&["선사", "구분", " 선사명 "]);
        assert_eq!(resolve_column(&mobis, "라인(선사명)", SchemaType::Mobis), Some(2));
    }

    #[test]
    fn test_unknown_or_missing_column() {
        let glovis = headers(&["구분"]);
        assert_eq!(resolve_column(&glovis, "없는열", SchemaType::Glovis), None);
        assert_eq!(resolve_column(&glovis, "비고", SchemaType::Glovis), None);
    }

    #[test]
    fn test_mapping_projection_and_reverse_lookup() {
        let glovis = headers(&["구분", "보관소", "화주", "비고"]);
        let mapping = ColumnMapping::new(&glovis, SchemaType::Glovis);

        assert_eq!(mapping.len(), CANONICAL_COLUMNS.len());
        assert_eq!(mapping.source_of(0), Some(0));
        assert_eq!(mapping.source_of(1), Some(2));
        assert_eq!(mapping.canonical_index_of(3), Some(22));
        // "보관소" has no canonical counterpart
        assert_eq!(mapping.canonical_index_of(1), None);

        let row = mapping.project_row(&headers(&["수출", "A동", "현대"]));
        assert_eq!(row.len(), 23);
        assert_eq!(row[0], "수출");
        assert_eq!(row[1], "현대");
        // Mapped index past the end of a short row
        assert_eq!(row[22], "");
    }
}
