use actix_web::http::StatusCode;
use shared::html::{escape, page};
use shared::PredictionResult;

use crate::storage::validation::ALLOWED_EXTENSIONS;

pub fn render_index(flash: Option<&str>) -> String {
    let flash_html = flash
        .map(|message| format!("<p class=\"flash\" role=\"alert\">{}</p>\n", escape(message)))
        .unwrap_or_default();
    let accept = ALLOWED_EXTENSIONS
        .iter()
        .map(|e| format!(".{}", e))
        .collect::<Vec<_>>()
        .join(",");

    let body = format!(
        "<h1>Image Classifier</h1>\n\
         <p>Upload a photo and get the five most likely ImageNet labels.</p>\n\
         {flash_html}\
         <form action=\"/predict\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"image\" accept=\"{accept}\" required>\n\
         <button type=\"submit\">Classify</button>\n\
         </form>"
    );
    page("Image Classifier", &body)
}

pub fn render_result(image_url: &str, filename: &str, result: &PredictionResult) -> String {
    let rows: String = result
        .iter()
        .enumerate()
        .map(|(rank, prediction)| {
            format!(
                "<tr><td>{}</td><td>{}</td><td class=\"score\">{:.2}%</td></tr>\n",
                rank + 1,
                escape(&prediction.label),
                prediction.score * 100.0
            )
        })
        .collect();

    let body = format!(
        "<h1>Prediction</h1>\n\
         <img class=\"preview\" src=\"{image_url}\" alt=\"{filename}\">\n\
         <p>Saved as <code>{filename}</code></p>\n\
         <table>\n<thead><tr><th>#</th><th>Label</th><th>Confidence</th></tr></thead>\n\
         <tbody>\n{rows}</tbody>\n</table>\n\
         <p><a href=\"/\">Classify another image</a></p>",
        image_url = escape(image_url),
        filename = escape(filename),
    );
    page("Prediction", &body)
}

pub fn render_error(status: StatusCode) -> String {
    let reason = status.canonical_reason().unwrap_or("Error");
    let detail = if status == StatusCode::NOT_FOUND {
        "The requested file does not exist."
    } else {
        "Something went wrong while handling your request."
    };
    let body = format!(
        "<h1>{} {}</h1>\n<p>{}</p>\n<p><a href=\"/\">Back to the upload form</a></p>",
        status.as_u16(),
        escape(reason),
        detail
    );
    page(reason, &body)
}
