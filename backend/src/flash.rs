//! One-shot user messages carried across a redirect in a cookie.

use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};

pub const FLASH_COOKIE: &str = "flash";

/// 302 to `location`, leaving `message` for the next page render.
///
/// The cookie value is percent-encoded on the wire by actix itself.
pub fn redirect_with_flash(location: &str, message: &str) -> HttpResponse {
    let cookie = Cookie::build(FLASH_COOKIE, message.to_owned())
        .path("/")
        .http_only(true)
        .finish();

    HttpResponse::Found()
        .append_header((header::LOCATION, location))
        .cookie(cookie)
        .finish()
}

pub fn take_flash(req: &HttpRequest) -> Option<String> {
    let cookie = req.cookie(FLASH_COOKIE)?;
    Some(cookie.value().to_owned()).filter(|message| !message.is_empty())
}

/// Expires the flash cookie once its message has been shown.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(FLASH_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}
