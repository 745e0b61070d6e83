use crate::schema::TemplateSchema;

/// Upper bound on template results shown while selecting.
pub const MAX_TEMPLATE_RESULTS: usize = 5;

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Templates whose name contains `query`, in stored order, capped at
/// [`MAX_TEMPLATE_RESULTS`].
pub fn filter_templates<'a>(templates: &'a [TemplateSchema], query: &str) -> Vec<&'a TemplateSchema> {
    templates
        .iter()
        .filter(|template| contains_ignore_case(&template.name, query))
        .take(MAX_TEMPLATE_RESULTS)
        .collect()
}

/// Options containing `query`, in option order.
pub fn filter_options<'a>(options: &'a [String], query: &str) -> Vec<&'a str> {
    options
        .iter()
        .filter(|option| contains_ignore_case(option, query))
        .map(String::as_str)
        .collect()
}

/// Moves `current` by `delta` within `0..len`, wrapping at both ends.
pub fn wrap_index(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).rem_euclid(len as isize) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str) -> TemplateSchema {
        TemplateSchema {
            id: name.to_lowercase(),
            name: name.into(),
            database_id: format!("db-{name}"),
            fields: Vec::new(),
        }
    }

    #[test]
    fn template_filter_is_case_insensitive_and_capped() {
        let templates: Vec<_> = [
            "Tasks", "Reading list", "Task backlog", "Bugs", "Team tasks", "TASK ideas",
            "Side tasks", "Groceries",
        ]
        .into_iter()
        .map(template)
        .collect();

        let names: Vec<_> = filter_templates(&templates, "task")
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Tasks", "Task backlog", "Team tasks", "TASK ideas", "Side tasks"]
        );

        assert_eq!(filter_templates(&templates, "").len(), MAX_TEMPLATE_RESULTS);
        assert!(filter_templates(&templates, "zzz").is_empty());
    }

    #[test]
    fn whitespace_in_the_query_is_significant() {
        let templates = vec![template("Tasks"), template("Team tasks")];
        assert!(filter_templates(&templates, "Tasks ").is_empty());
        assert!(filter_templates(&templates, "   ").is_empty());
        assert_eq!(filter_templates(&templates, "m t").len(), 1);

        let options = vec!["In progress".to_string(), "Done".into()];
        assert_eq!(filter_options(&options, "n p"), vec!["In progress"]);
        assert_eq!(filter_options(&options, " "), vec!["In progress"]);
    }

    #[test]
    fn option_filter_keeps_order() {
        let options = vec!["Backlog".to_string(), "In progress".into(), "Blocked".into()];
        assert_eq!(filter_options(&options, "b"), vec!["Backlog", "Blocked"]);
        assert_eq!(filter_options(&options, "PROG"), vec!["In progress"]);
    }

    #[test]
    fn wrap_index_wraps_both_ways() {
        assert_eq!(wrap_index(2, 1, 3), 0);
        assert_eq!(wrap_index(0, -1, 3), 2);
        assert_eq!(wrap_index(1, 1, 3), 2);
        assert_eq!(wrap_index(0, 1, 0), 0);
    }
}
