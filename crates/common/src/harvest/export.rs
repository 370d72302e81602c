//! Output formats for harvested reviews

use super::HarvestedReview;
use chrono::NaiveDate;
use serde_json::{json, Value};

const MONTHS: [&str; 12] = [
    "января", "февраля", "марта", "апреля", "мая", "июня", "июля", "августа", "сентября",
    "октября", "ноября", "декабря",
];

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Spreadsheet-compatible HTML table (opens as `.xls`)
///
/// Cells are forced to text so dates and ratings are not reinterpreted.
pub fn render_spreadsheet(reviews: &[HarvestedReview]) -> String {
    let mut table = String::from("<table>\n<tr><th>Дата</th><th>Время сбора</th><th>Оценка</th><th>Отзыв</th></tr>\n");

    for review in reviews {
        let rating = review
            .rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "Нет оценки".to_string());
        table.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&review.date),
            review.collected_at.format("%H:%M:%S"),
            rating,
            escape_html(&review.text),
        ));
    }
    table.push_str("</table>");

    format!(
        concat!(
            "<html xmlns:o=\"urn:schemas-microsoft-com:office:office\" ",
            "xmlns:x=\"urn:schemas-microsoft-com:office:excel\" ",
            "xmlns=\"http://www.w3.org/TR/REC-html40\">\n",
            "<head>\n",
            "<meta http-equiv=\"Content-Type\" content=\"text/html; charset=UTF-8\">\n",
            "<style>td {{ mso-number-format:\"\\@\"; }}</style>\n",
            "</head>\n<body>\n{}\n</body>\n</html>\n"
        ),
        table
    )
}

/// "12 марта 2024" to an ISO date; other layouts pass through unchanged
pub fn normalize_card_date(displayed: &str) -> String {
    let parts: Vec<&str> = displayed.split_whitespace().collect();
    if let [day, month, year] = parts.as_slice() {
        let month = MONTHS.iter().position(|m| *m == month.to_lowercase());
        if let (Ok(day), Some(month), Ok(year)) = (day.parse::<u32>(), month, year.parse::<i32>()) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month as u32 + 1, day) {
                return date.format("%Y-%m-%d").to_string();
            }
        }
    }
    displayed.to_string()
}

/// Rows in the shape batch ingestion accepts
pub fn to_ingest_rows(reviews: &[HarvestedReview]) -> Vec<Value> {
    reviews
        .iter()
        .map(|r| {
            json!({
                "text": r.text,
                "rating": r.rating,
                "date": normalize_card_date(&r.date),
                "collectionTime": r.collected_at.to_rfc3339(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn review(text: &str, rating: Option<u8>) -> HarvestedReview {
        HarvestedReview {
            date: "12 марта 2024".into(),
            collected_at: Utc.with_ymd_and_hms(2024, 3, 20, 14, 5, 9).unwrap(),
            rating,
            text: text.into(),
        }
    }

    #[test]
    fn test_spreadsheet_escapes_text() {
        let html = render_spreadsheet(&[review("<b>Fast</b> & cheap", Some(5)), review("Meh", None)]);
        assert!(html.contains("<th>Дата</th><th>Время сбора</th><th>Оценка</th><th>Отзыв</th>"));
        assert!(html.contains("<td>&lt;b&gt;Fast&lt;/b&gt; &amp; cheap</td>"));
        assert!(html.contains("<td>14:05:09</td><td>5</td>"));
        assert!(html.contains("<td>Нет оценки</td>"));
        assert!(html.contains("mso-number-format:\"\\@\""));
    }

    #[test]
    fn test_card_dates() {
        assert_eq!(normalize_card_date("12 марта 2024"), "2024-03-12");
        assert_eq!(normalize_card_date("31 февраля 2024"), "31 февраля 2024");
        assert_eq!(normalize_card_date("вчера"), "вчера");
    }

    #[test]
    fn test_ingest_rows_shape() {
        let rows = to_ingest_rows(&[review("Good", Some(4))]);
        assert_eq!(rows[0]["text"], "Good");
        assert_eq!(rows[0]["rating"], 4);
        assert_eq!(rows[0]["date"], "2024-03-12");
        assert_eq!(rows[0]["collectionTime"], "2024-03-20T14:05:09+00:00");
    }
}
