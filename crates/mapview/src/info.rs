use places::SavedPlace;

/// Info-window markup for one marker: name, rounded coordinates, save date.
pub fn info_window_html(place: &SavedPlace) -> String {
    format!(
        "<div class=\"place-info\"><h3>{}</h3><p>{:.6}, {:.6}</p><p>Saved: {}</p></div>",
        escape_html(&place.name),
        place.lat,
        place.lng,
        saved_date(place.created_at_ms),
    )
}

/// `YYYY-MM-DD` for a creation timestamp in epoch milliseconds.
pub fn saved_date(created_at_ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(created_at_ms as i64)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Place names are user input and end up inside SDK-rendered HTML.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn place() -> SavedPlace {
        SavedPlace {
            id: "1".to_string(),
            name: "Home".to_string(),
            lat: -1.2863891234,
            lng: 36.8172234567,
            // 2024-05-15T00:00:00Z
            created_at_ms: 1_715_731_200_000,
        }
    }

    #[test]
    fn html_shows_name_rounded_coords_and_date() {
        let html = info_window_html(&place());
        assert!(html.contains("<h3>Home</h3>"));
        assert!(html.contains("-1.286389, 36.817223"));
        assert!(html.contains("Saved: 2024-05-15"));
    }

    #[test]
    fn name_is_escaped() {
        let mut p = place();
        p.name = "<b>\"Bob's\" & co</b>".to_string();
        let html = info_window_html(&p);
        assert!(html.contains("&lt;b&gt;&quot;Bob&#39;s&quot; &amp; co&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn date_formats_from_epoch_millis() {
        assert_eq!(saved_date(0), "1970-01-01");
        assert_eq!(saved_date(1_715_731_200_000), "2024-05-15");
    }
}
