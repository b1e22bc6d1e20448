use std::fmt::Write;

use crate::{
    core::state::CameraStatus,
    form::{DESCRIPTION_MAX_CHARS, FieldErrors, FormValues},
    location::Location,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Alert(String),
}

pub struct PageView<'a> {
    pub app_name: &'a str,
    pub submitter: &'a str,
    pub preview_url: &'a str,
    pub camera: &'a CameraStatus,
    pub location: &'a Location,
    pub values: &'a FormValues,
    pub errors: &'a FieldErrors,
    pub notice: Option<&'a Notice>,
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn field_help(error: Option<&String>, hint: &str) -> String {
    match error {
        Some(message) => format!("<p class=\"help is-danger\">{}</p>", escape(message)),
        None => format!("<p class=\"help\">{hint}</p>"),
    }
}

fn input_class(error: Option<&String>) -> &'static str {
    if error.is_some() { " is-danger" } else { "" }
}

fn capture_controls(view: &PageView<'_>) -> String {
    if !view.camera.enabled {
        return "<button class=\"button is-primary\" formaction=\"/capture/start\" \
                formmethod=\"post\" formnovalidate>Start</button>"
            .to_owned();
    }

    format!(
        "<div class=\"mb-2\"><button class=\"button\" formaction=\"/capture/end\" \
         formmethod=\"post\" formnovalidate>End</button></div>\
         <div class=\"mb-2\"><img class=\"feed\" src=\"/stream\" alt=\"Live camera feed ({facing})\"></div>\
         <div class=\"buttons\">\
         <button class=\"button is-link\" formaction=\"/capture/snap\" formmethod=\"post\" formnovalidate>Capture</button>\
         <button class=\"button\" formaction=\"/capture/toggle\" formmethod=\"post\" formnovalidate>Switch Camera</button>\
         </div>",
        facing = view.camera.facing.label(),
    )
}

pub fn render(view: &PageView<'_>) -> String {
    let mut body = String::new();

    if let Some(notice) = view.notice {
        let (class, role, text) = match notice {
            Notice::Info(text) => ("is-info", "status", text),
            Notice::Alert(text) => ("is-danger", "alert", text),
        };
        let _ = write!(
            body,
            "<div class=\"notification {class}\" role=\"{role}\">{}</div>",
            escape(text)
        );
    }

    if !view.errors.is_empty() {
        body.push_str(
            "<div class=\"notification is-warning\" role=\"alert\">Please fix the highlighted fields.</div>",
        );
    }

    let location = if view.location.is_empty() {
        "Location not resolved yet".to_owned()
    } else {
        format!(
            "lat {}, long {}",
            escape(&view.location.latitude),
            escape(&view.location.longitude)
        )
    };

    let _ = write!(
        body,
        "<figure class=\"image preview\"><img id=\"preview\" src=\"{preview}\" alt=\"Preview of the captured image\"></figure>\
         <form method=\"post\" action=\"/trees\" class=\"box\">\
         <div class=\"field\"><label class=\"label\">Capture Picture</label>{controls}\
         <p class=\"help\">{location}</p></div>\
         <div class=\"field\"><label class=\"label\" for=\"fallback\">No webcam? Upload a picture</label>\
         <input class=\"input\" type=\"file\" id=\"fallback\" accept=\"image/*\" data-endpoint=\"/capture/data-url\"></div>\
         <div class=\"field\"><label class=\"label\" for=\"name\">Name</label>\
         <input class=\"input{name_class}\" id=\"name\" name=\"name\" value=\"{name}\">{name_help}</div>\
         <div class=\"field\"><label class=\"label\" for=\"type\">Type</label>\
         <input class=\"input{type_class}\" id=\"type\" name=\"type\" value=\"{tree_type}\">{type_help}</div>\
         <div class=\"field\"><label class=\"label\" for=\"description\">Description</label>\
         <textarea class=\"textarea has-fixed-size{description_class}\" id=\"description\" name=\"description\" \
         placeholder=\"Type here\">{description}</textarea>{description_help}</div>\
         <div class=\"field\"><button class=\"button is-success is-fullwidth\" type=\"submit\">Submit new tree</button>\
         <p class=\"has-text-centered\">OR</p>\
         <a class=\"button is-outlined is-fullwidth\" href=\"/update\">Update your existing tree</a></div>\
         </form>",
        preview = escape(view.preview_url),
        controls = capture_controls(view),
        name_class = input_class(view.errors.name.as_ref()),
        name = escape(&view.values.name),
        name_help = field_help(view.errors.name.as_ref(), "Name your tree (important!)"),
        type_class = input_class(view.errors.tree_type.as_ref()),
        tree_type = escape(&view.values.tree_type),
        type_help = field_help(
            view.errors.tree_type.as_ref(),
            "What kind of tree did you plant?"
        ),
        description_class = input_class(view.errors.description.as_ref()),
        description = escape(&view.values.description),
        description_help = field_help(
            view.errors.description.as_ref(),
            &format!(
                "Tell everyone about your newly planted tree! Up to {DESCRIPTION_MAX_CHARS} characters."
            )
        ),
    );

    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title}</title><link rel=\"stylesheet\" href=\"/static/style.css\">\
         <script src=\"/static/fallback.js\" defer></script></head>\
         <body><main class=\"container\"><p class=\"is-size-7\">Submitting as {submitter}</p>{body}</main></body></html>",
        title = escape(view.app_name),
        submitter = escape(view.submitter),
    )
}

#[cfg(test)]
mod tests {
    use crate::{
        core::state::{CameraState, CameraStatus, FacingMode},
        form::{FieldErrors, FormValues},
        location::Location,
    };

    use super::{Notice, PageView, escape, render};

    fn idle() -> CameraStatus {
        CameraStatus {
            enabled: false,
            stream_active: false,
            facing: FacingMode::User,
            state: CameraState::Idle,
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<b>"Oak" & 'Elm'</b>"#),
            "&lt;b&gt;&quot;Oak&quot; &amp; &#39;Elm&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn idle_page_offers_start_only() {
        let camera = idle();
        let html = render(&PageView {
            app_name: "treecam",
            submitter: "user_1",
            preview_url: "/static/tree.svg",
            camera: &camera,
            location: &Location::default(),
            values: &FormValues::default(),
            errors: &FieldErrors::default(),
            notice: None,
        });

        assert!(html.contains("formaction=\"/capture/start\""));
        assert!(!html.contains("src=\"/stream\""));
        assert!(html.contains("src=\"/static/tree.svg\""));
        assert!(html.contains("href=\"/update\""));
        assert!(html.contains("Location not resolved yet"));
        assert!(!html.contains("Please fix the highlighted fields."));
        assert!(html.contains("type=\"file\" id=\"fallback\""));
        assert!(html.contains("data-endpoint=\"/capture/data-url\""));
        assert!(html.contains("src=\"/static/fallback.js\""));
        assert!(html.contains("Up to 100 characters."));
        assert!(!html.contains("maxlength"));
    }

    #[test]
    fn started_page_shows_feed_values_and_errors() {
        let camera = CameraStatus {
            enabled: true,
            state: CameraState::Ready,
            ..idle()
        };
        let values = FormValues {
            name: "<script>".to_string(),
            tree_type: "Teak".to_string(),
            description: String::new(),
        };
        let errors = FieldErrors {
            description: Some("Description must be between 1 and 100 characters.".to_string()),
            ..FieldErrors::default()
        };
        let location = Location {
            latitude: "1.5".to_string(),
            longitude: "2.25".to_string(),
        };
        let notice = Notice::Alert("Geolocation is not supported by this station.".to_string());
        let html = render(&PageView {
            app_name: "treecam",
            submitter: "user_1",
            preview_url: "data:image/jpeg;base64,AAAA",
            camera: &camera,
            location: &location,
            values: &values,
            errors: &errors,
            notice: Some(&notice),
        });

        assert!(html.contains("src=\"/stream\""));
        assert!(html.contains("formaction=\"/capture/snap\""));
        assert!(html.contains("formaction=\"/capture/toggle\""));
        assert!(html.contains("value=\"&lt;script&gt;\""));
        assert!(html.contains("help is-danger\">Description must be between"));
        assert!(html.contains("role=\"alert\">Geolocation is not supported"));
        assert!(html.contains("lat 1.5, long 2.25"));
        assert!(html.contains("Please fix the highlighted fields."));
    }
}
