use std::collections::BTreeMap;

/// `class -> section -> year -> [records]`.
pub type ClassSectionYear<T> = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<T>>>>;

/// Group records by their own `(class, section, year)` triple.
///
/// Every input record lands in exactly one leaf bucket, in input order.
pub fn group_by_class_section_year<T, F>(records: impl IntoIterator<Item = T>, key: F) -> ClassSectionYear<T>
where
    F: Fn(&T) -> (&str, &str, &str),
{
    let mut grouped: ClassSectionYear<T> = BTreeMap::new();
    for record in records {
        let (class, section, year) = key(&record);
        let (class, section, year) = (class.to_string(), section.to_string(), year.to_string());
        grouped
            .entry(class)
            .or_default()
            .entry(section)
            .or_default()
            .entry(year)
            .or_default()
            .push(record);
    }
    grouped
}
