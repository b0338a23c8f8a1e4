//! Editor page URLs: `<editor page>?image=<data URL>`.

use url::Url;

use super::EditorError;

/// Builds the URL that opens the editor on `data_url`.
pub fn editor_url(editor_page: &str, data_url: &str) -> Result<Url, EditorError> {
    let mut url = Url::parse(editor_page)?;
    url.query_pairs_mut().append_pair("image", data_url);
    Ok(url)
}

/// Extracts the `image` parameter from an editor URL.
pub fn image_param(editor_url: &str) -> Result<String, EditorError> {
    let url = Url::parse(editor_url)?;
    url.query_pairs()
        .find(|(key, _)| key == "image")
        .map(|(_, value)| value.into_owned())
        .ok_or(EditorError::MissingImage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_survives_query_encoding() {
        let data_url = "data:image/png;base64,iVBO+w0K/GgoAAA==";
        let url = editor_url("chrome-extension://abcdef/screenshot-editor.html", data_url).unwrap();
        assert!(url.as_str().starts_with("chrome-extension://abcdef/screenshot-editor.html?image="));
        assert!(!url.as_str().contains('+'));
        assert_eq!(image_param(url.as_str()).unwrap(), data_url);
    }

    #[test]
    fn missing_parameter_is_an_error() {
        assert!(matches!(
            image_param("file:///editor.html?zoom=2"),
            Err(EditorError::MissingImage)
        ));
        assert!(matches!(
            image_param("not a url"),
            Err(EditorError::InvalidUrl(_))
        ));
    }
}
