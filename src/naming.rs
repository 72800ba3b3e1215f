//! JSON naming conventions for API documents
//!
//! Metamodel names are PascalCase; API document fields are camelCase with
//! acronym-aware decapitalization, pluralized collection names, and parent
//! entity prefix elision for non-reference properties.

/// Lowercases the leading uppercase run of a name, keeping the last letter of
/// the run uppercase when it starts a new word (`IEPBeginDate` -> `iepBeginDate`,
/// `URI` -> `uri`, `SchoolId` -> `schoolId`).
pub fn decapitalize(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let run = chars.iter().take_while(|c| c.is_ascii_uppercase()).count();
    if run == 0 {
        return name.to_string();
    }

    // A run followed by a lowercase letter keeps its final letter as the start
    // of the next word; a bare pluralization `s` does not count as a word
    let followed_by_word = run < chars.len() && !(run == chars.len() - 1 && chars[run] == 's');
    let lower_until = if followed_by_word && run > 1 {
        run - 1
    } else {
        run
    };

    chars
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i < lower_until {
                c.to_ascii_lowercase()
            } else {
                *c
            }
        })
        .collect()
}

/// Uppercases the first letter of a name
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// English pluralization for collection names
pub fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) && !stem.is_empty() {
            return format!("{stem}ies");
        }
    }
    if name.ends_with('s')
        || name.ends_with('x')
        || name.ends_with('z')
        || name.ends_with("ch")
        || name.ends_with("sh")
    {
        return format!("{name}es");
    }
    format!("{name}s")
}

/// Inverse of [`pluralize`], used for collection item names
pub fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = name.strip_suffix("es") {
        if stem.ends_with('s')
            || stem.ends_with('x')
            || stem.ends_with('z')
            || stem.ends_with("ch")
            || stem.ends_with("sh")
        {
            return stem.to_string();
        }
    }
    name.strip_suffix('s').unwrap_or(name).to_string()
}

/// Removes the longest leading portion of `name` that overlaps a trailing
/// portion of the parent entity name, at a word boundary. Returns `None` when
/// there is no overlap or stripping would consume the whole name.
///
/// `AssessmentScore` on `ObjectiveAssessment` -> `Score`;
/// `SectionIdentifier` on `Section` is handled by the caller, which only
/// applies elision to commons and non-reference collections.
pub fn strip_parent_overlap(name: &str, parent_name: &str) -> Option<String> {
    let max = name.len().min(parent_name.len());
    for k in (1..=max).rev() {
        if !name.is_char_boundary(k) {
            continue;
        }
        let (prefix, remainder) = name.split_at(k);
        if remainder.is_empty() {
            continue;
        }
        if parent_name.ends_with(prefix)
            && remainder.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        {
            return Some(remainder.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decapitalize_single_uppercase() {
        assert_eq!(decapitalize("SchoolId"), "schoolId");
        assert_eq!(decapitalize("LocalCourseCode"), "localCourseCode");
    }

    #[test]
    fn test_decapitalize_acronym_run() {
        assert_eq!(decapitalize("IEPBeginDate"), "iepBeginDate");
        assert_eq!(decapitalize("URIForContent"), "uriForContent");
    }

    #[test]
    fn test_decapitalize_all_caps() {
        assert_eq!(decapitalize("URI"), "uri");
        assert_eq!(decapitalize("ID"), "id");
        assert_eq!(decapitalize("URIs"), "uris");
    }

    #[test]
    fn test_decapitalize_already_lower() {
        assert_eq!(decapitalize("schoolYear"), "schoolYear");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("School"), "Schools");
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Address"), "Addresses");
        assert_eq!(pluralize("Bus"), "Buses");
        assert_eq!(pluralize("Day"), "Days");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("Schools"), "School");
        assert_eq!(singularize("Categories"), "Category");
        assert_eq!(singularize("Addresses"), "Address");
        assert_eq!(singularize("SuffixNames"), "SuffixName");
    }

    #[test]
    fn test_strip_parent_overlap_full_prefix() {
        assert_eq!(
            strip_parent_overlap("EducationContentSuffixName", "EducationContent"),
            Some("SuffixName".to_string())
        );
    }

    #[test]
    fn test_strip_parent_overlap_partial_suffix() {
        assert_eq!(
            strip_parent_overlap("AssessmentScore", "ObjectiveAssessment"),
            Some("Score".to_string())
        );
        assert_eq!(
            strip_parent_overlap("DiscussionTopicWithRoleNameTopic", "ClassDiscussion"),
            Some("TopicWithRoleNameTopic".to_string())
        );
    }

    #[test]
    fn test_strip_parent_overlap_none() {
        assert_eq!(strip_parent_overlap("MeetingTime", "ClassPeriod"), None);
    }

    #[test]
    fn test_strip_parent_overlap_whole_name() {
        // stripping may not consume the entire name
        assert_eq!(strip_parent_overlap("School", "School"), None);
    }

    #[test]
    fn test_strip_parent_overlap_word_boundary() {
        // remainder must start a new word
        assert_eq!(strip_parent_overlap("Classroom", "Class"), None);
    }
}
