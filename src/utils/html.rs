/// Sanitizes free-form text that clients render as HTML (quiz descriptions).
///
/// Whitelist based: harmless formatting tags survive, `<script>` and event
/// handler attributes are stripped. Not applied to question or option text,
/// which is compared verbatim when scoring.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
