// src/formatting.rs

use crate::core::SecurityEvent;

/// Renders the subject line and body of an alert email.
pub trait AlertFormatter: Send + Sync {
    fn subject(&self, event: &SecurityEvent) -> String;
    fn html_body(&self, event: &SecurityEvent) -> String;
}

/// The default HTML alert: a headline, the event details and the captured image.
pub struct HtmlAlertFormatter;

impl AlertFormatter for HtmlAlertFormatter {
    fn subject(&self, event: &SecurityEvent) -> String {
        format!(
            "⚠️ Threat Alert: {} detected at {}!",
            event.event_type(),
            event.location_name()
        )
    }

    fn html_body(&self, event: &SecurityEvent) -> String {
        format!(
            r#"
<h1>Threat Alert</h1>
<p>Hello,</p>
<p>Our system has detected <strong>{event_type}</strong> on device <strong>{device_id}</strong> located at <strong>{location_name}</strong>.</p>
<p>An image was captured for reference.</p>
<img src="{image_ref}" alt="Captured Image" style="max-width: 400px; border-radius: 8px;" />
<p>Please check your app for more details.</p>
<br/>
<p>Thank you,</p>
<p>Your Smart Security Team</p>
"#,
            event_type = escape_html(event.event_type()),
            device_id = escape_html(event.device_id()),
            location_name = escape_html(event.location_name()),
            image_ref = escape_html(event.image_ref()),
        )
    }
}

/// Escapes the characters that are significant inside HTML text and attributes.
/// Quotes are escaped too, so the result is safe in single- or double-quoted
/// attribute values such as `src`.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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
