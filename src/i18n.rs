use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Display language for rendered cells and operator messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    He,
}

/// Static message catalog for one locale.
pub struct Messages {
    pub yes: &'static str,
    pub no: &'static str,
    pub no_label: &'static str,
    pub record_created: &'static str,
    pub record_updated: &'static str,
    pub record_deleted: &'static str,
    pub schema_saved: &'static str,
    pub schema_deleted: &'static str,
    pub column_saved: &'static str,
    pub column_deleted: &'static str,
    pub columns_reordered: &'static str,
    pub export_done: &'static str,
    pub export_failed: &'static str,
    pub store_failed: &'static str,
    pub load_failed: &'static str,
    pub delete_failed: &'static str,
    pub parse_failed: &'static str,
    pub invalid_structure: &'static str,
    pub edit_in_progress: &'static str,
    pub not_found: &'static str,
    pub already_exists: &'static str,
    pub schema_not_loaded: &'static str,
    required_prefix: &'static str,
    page_of: &'static str,
    records: &'static str,
    pub date_format: &'static str,
    pub time_format: &'static str,
    pub datetime_format: &'static str,
}

const EN: Messages = Messages {
    yes: "Yes",
    no: "No",
    no_label: "No label",
    record_created: "New record created",
    record_updated: "Record updated",
    record_deleted: "Record deleted",
    schema_saved: "Schema saved",
    schema_deleted: "Schema deleted",
    column_saved: "Column saved",
    column_deleted: "Column deleted",
    columns_reordered: "Column order updated",
    export_done: "Data exported",
    export_failed: "Failed to export data",
    store_failed: "Failed to save to the store",
    load_failed: "Failed to load data",
    delete_failed: "Failed to delete the record",
    parse_failed: "Malformed JSON, please check the format",
    invalid_structure: "Invalid schema structure: the schema must be of type \"object\" with a \"properties\" member",
    edit_in_progress: "Another row is being edited",
    not_found: "Not found",
    already_exists: "Already exists",
    schema_not_loaded: "Table settings are not loaded",
    required_prefix: "Please enter",
    page_of: "of",
    records: "records",
    date_format: "%m/%d/%Y",
    time_format: "%I:%M:%S %p",
    datetime_format: "%m/%d/%Y, %I:%M:%S %p",
};

const HE: Messages = Messages {
    yes: "כן",
    no: "לא",
    no_label: "ללא תווית",
    record_created: "רשומה חדשה נוצרה בהצלחה",
    record_updated: "הרשומה עודכנה בהצלחה",
    record_deleted: "הרשומה נמחקה בהצלחה",
    schema_saved: "הסכמה נשמרה בהצלחה",
    schema_deleted: "הסכמה נמחקה בהצלחה",
    column_saved: "העמודה נשמרה בהצלחה",
    column_deleted: "העמודה נמחקה בהצלחה",
    columns_reordered: "סדר העמודות עודכן בהצלחה",
    export_done: "הנתונים יוצאו בהצלחה",
    export_failed: "שגיאה בייצוא הנתונים",
    store_failed: "שגיאה בשמירת הרשומה",
    load_failed: "שגיאה בטעינת נתונים",
    delete_failed: "שגיאה במחיקת הרשומה",
    parse_failed: "שגיאת פרסור ב-JSON. נא לבדוק את הפורמט",
    invalid_structure: "מבנה סכמה לא תקין. הסכמה חייבת להיות מסוג \"object\" עם מאפיין \"properties\"",
    edit_in_progress: "שורה אחרת נמצאת בעריכה",
    not_found: "לא נמצא",
    already_exists: "כבר קיים",
    schema_not_loaded: "הגדרות הטבלה לא נטענו",
    required_prefix: "נא להזין",
    page_of: "מתוך",
    records: "רשומות",
    date_format: "%d.%m.%Y",
    time_format: "%H:%M:%S",
    datetime_format: "%d.%m.%Y, %H:%M:%S",
};

impl Locale {
    #[must_use]
    pub fn messages(self) -> &'static Messages {
        match self {
            Locale::En => &EN,
            Locale::He => &HE,
        }
    }

    #[must_use]
    pub fn yes_no(self, value: bool) -> &'static str {
        let messages = self.messages();
        if value { messages.yes } else { messages.no }
    }

    /// "Please enter <title>", the message attached to a missing required field.
    #[must_use]
    pub fn required_field(self, title: &str) -> String {
        format!("{} {title}", self.messages().required_prefix)
    }

    /// Pagination footer, e.g. "1-10 of 57 records".
    #[must_use]
    pub fn page_summary(self, start: usize, end: usize, total: usize) -> String {
        let messages = self.messages();
        format!(
            "{start}-{end} {} {total} {}",
            messages.page_of, messages.records
        )
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => write!(f, "en"),
            Locale::He => write!(f, "he"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "he" => Ok(Locale::He),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_summary() {
        assert_eq!(Locale::En.page_summary(1, 10, 57), "1-10 of 57 records");
        assert_eq!(Locale::He.page_summary(11, 20, 57), "11-20 מתוך 57 רשומות");
    }

    #[test]
    fn test_yes_no() {
        assert_eq!(Locale::En.yes_no(true), "Yes");
        assert_eq!(Locale::He.yes_no(false), "לא");
    }

    #[test]
    fn test_parse_locale() {
        assert_eq!("HE".parse::<Locale>().unwrap(), Locale::He);
        assert!("fr".parse::<Locale>().is_err());
    }
}
