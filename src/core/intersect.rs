use std::collections::HashSet;
use std::hash::Hash;

use crate::models::{DifficultyLevel, MatchCriteria, MatchPolicy, ProgrammingLanguage};

/// Intersection of two lists, in the order of `left`
///
/// Runs in O(|left| + |right|) using a hash set over `right`.
pub fn intersect<T>(left: &[T], right: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let lookup: HashSet<&T> = right.iter().collect();
    let mut seen: HashSet<&T> = HashSet::with_capacity(left.len().min(right.len()));

    left.iter()
        .filter(|item| lookup.contains(item) && seen.insert(*item))
        .cloned()
        .collect()
}

/// Whether two requests can agree on a programming language
///
/// Compatible when either side generalizes, when both declared no language
/// (the fallback applies), or when the declared sets overlap.
#[inline]
pub fn language_compatible(a: &MatchCriteria, b: &MatchCriteria) -> bool {
    if a.generalize_languages || b.generalize_languages {
        return true;
    }

    if a.programming_languages.is_empty() && b.programming_languages.is_empty() {
        return true;
    }

    let lookup: HashSet<&ProgrammingLanguage> = b.programming_languages.iter().collect();
    a.programming_languages.iter().any(|lang| lookup.contains(lang))
}

#[inline]
pub fn difficulty_intersection(a: &MatchCriteria, b: &MatchCriteria) -> Vec<DifficultyLevel> {
    intersect(&a.difficulty_levels, &b.difficulty_levels)
}

#[inline]
pub fn category_intersection(a: &MatchCriteria, b: &MatchCriteria) -> Vec<String> {
    intersect(&a.categories, &b.categories)
}

/// Full compatibility check used by the pool
///
/// Language compatibility is always required. Difficulty and category overlap
/// only gate the pair when the policy asks for it.
pub fn is_compatible(a: &MatchCriteria, b: &MatchCriteria, policy: &MatchPolicy) -> bool {
    if !language_compatible(a, b) {
        return false;
    }

    if policy.require_difficulty_overlap && difficulty_intersection(a, b).is_empty() {
        return false;
    }

    if policy.require_category_overlap && category_intersection(a, b).is_empty() {
        return false;
    }

    true
}

/// Pick the session language for a compatible pair
///
/// Order of preference:
/// 1. First shared language, in `a`'s declared order
/// 2. First language of a side that did not generalize
/// 3. First language declared by either side
/// 4. The policy fallback
pub fn select_language(
    a: &MatchCriteria,
    b: &MatchCriteria,
    fallback: ProgrammingLanguage,
) -> ProgrammingLanguage {
    if let Some(lang) = intersect(&a.programming_languages, &b.programming_languages).first() {
        return *lang;
    }

    let strict = [a, b]
        .into_iter()
        .filter(|c| !c.generalize_languages)
        .find_map(|c| c.programming_languages.first());

    strict
        .or_else(|| a.programming_languages.first())
        .or_else(|| b.programming_languages.first())
        .copied()
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(
        difficulty: &[DifficultyLevel],
        categories: &[&str],
        languages: &[ProgrammingLanguage],
        generalize: bool,
    ) -> MatchCriteria {
        MatchCriteria {
            difficulty_levels: difficulty.to_vec(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            programming_languages: languages.to_vec(),
            generalize_languages: generalize,
        }
    }

    #[test]
    fn test_intersect_keeps_left_order() {
        let left = vec![3, 1, 2, 1];
        let right = vec![1, 2, 3];
        assert_eq!(intersect(&left, &right), vec![3, 1, 2]);
    }

    #[test]
    fn test_intersect_empty() {
        let left: Vec<u8> = vec![];
        assert!(intersect(&left, &[1, 2]).is_empty());
        assert!(intersect(&[1, 2], &[3]).is_empty());
    }

    #[test]
    fn test_generalize_always_compatible() {
        use ProgrammingLanguage::*;
        let a = criteria(&[], &[], &[Java], true);
        let b = criteria(&[], &[], &[Python], false);
        assert!(language_compatible(&a, &b));
        assert!(language_compatible(&b, &a));
    }

    #[test]
    fn test_disjoint_languages_incompatible() {
        use ProgrammingLanguage::*;
        let a = criteria(&[], &[], &[Java, C], false);
        let b = criteria(&[], &[], &[Python, Go], false);
        assert!(!language_compatible(&a, &b));
    }

    #[test]
    fn test_both_empty_languages_compatible() {
        let a = criteria(&[], &[], &[], false);
        let b = criteria(&[], &[], &[], false);
        assert!(language_compatible(&a, &b));
        assert_eq!(
            select_language(&a, &b, ProgrammingLanguage::JavaScript),
            ProgrammingLanguage::JavaScript
        );
    }

    #[test]
    fn test_one_sided_empty_languages_incompatible() {
        let a = criteria(&[], &[], &[], false);
        let b = criteria(&[], &[], &[ProgrammingLanguage::Go], false);
        assert!(!language_compatible(&a, &b));
    }

    #[test]
    fn test_select_language_prefers_strict_side() {
        use ProgrammingLanguage::*;
        let flexible = criteria(&[], &[], &[Java], true);
        let strict = criteria(&[], &[], &[Go, C], false);
        assert_eq!(select_language(&flexible, &strict, JavaScript), Go);
    }

    #[test]
    fn test_policy_gates_on_overlap() {
        use DifficultyLevel::*;
        let a = criteria(&[Easy], &["arrays"], &[], false);
        let b = criteria(&[Hard], &["graphs"], &[], false);

        assert!(is_compatible(&a, &b, &MatchPolicy::default()));

        let strict_difficulty = MatchPolicy {
            require_difficulty_overlap: true,
            ..MatchPolicy::default()
        };
        assert!(!is_compatible(&a, &b, &strict_difficulty));

        let strict_category = MatchPolicy {
            require_category_overlap: true,
            ..MatchPolicy::default()
        };
        assert!(!is_compatible(&a, &b, &strict_category));
    }

    #[test]
    fn test_intersections_scenario() {
        use DifficultyLevel::*;
        use ProgrammingLanguage::*;
        let a = criteria(&[Easy], &["arrays"], &[Python], false);
        let b = criteria(&[Easy, Medium], &["arrays", "graphs"], &[Python, Go], false);

        assert!(language_compatible(&a, &b));
        assert_eq!(difficulty_intersection(&a, &b), vec![Easy]);
        assert_eq!(category_intersection(&a, &b), vec!["arrays"]);
        assert_eq!(select_language(&a, &b, JavaScript), Python);
    }
}
