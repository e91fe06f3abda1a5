//! Assistant instructions.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

/// Today's calendar date in the given timezone.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Build the instructions for the personal assistant.
///
/// The date is formatted `YYYY-MM-DD` and the timezone by its IANA name.
pub fn build_instructions(owner_name: Option<&str>, today: NaiveDate, tz: Tz) -> String {
    let owner = match owner_name {
        Some(name) => format!("{name}'s"),
        None => "your owner's".to_string(),
    };
    format!(
        "As {owner} personal AI assistant, you have access to their detailed profile and \
         preferences through a JSON file. Your role includes maintaining their health, \
         organization, and social connections. Today's date is {today}, and the timezone \
         is {tz}. Utilize this information to effectively manage their schedule, suggest \
         healthy routines, and foster meaningful interactions with their friends and family.",
        today = today.format("%Y-%m-%d"),
        tz = tz.name(),
    )
}
