// Differential formats (dxf) from xl/styles.xml.
//
// Conditional-format rules point at a dxf by index; the dxf carries the fill
// that the rule paints. Only the fill color matters for report read-back.

use quick_xml::events::Event;
use quick_xml::Reader;

/// Fill color (0xRRGGBB) of every `<dxf>` in styles.xml, by dxf index.
/// `None` when a dxf has no solid fill color.
pub fn parse_dxf_fills(styles_xml: &str) -> Result<Vec<Option<u32>>, String> {
    let mut reader = Reader::from_str(styles_xml);
    reader.config_mut().trim_text(true);

    let mut fills = Vec::new();
    let mut buf = Vec::new();
    let mut in_dxfs = false;
    let mut in_dxf = false;
    let mut bg: Option<u32> = None;
    let mut fg: Option<u32> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"dxfs" => in_dxfs = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"dxfs" => in_dxfs = false,
            Ok(Event::Start(ref e)) if in_dxfs && e.name().as_ref() == b"dxf" => {
                in_dxf = true;
                bg = None;
                fg = None;
            }
            Ok(Event::Empty(ref e)) if in_dxfs && e.name().as_ref() == b"dxf" => {
                fills.push(None);
            }
            Ok(Event::End(ref e)) if in_dxfs && e.name().as_ref() == b"dxf" => {
                in_dxf = false;
                fills.push(bg.or(fg));
            }
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if in_dxf && (e.name().as_ref() == b"bgColor" || e.name().as_ref() == b"fgColor") =>
            {
                let is_bg = e.name().as_ref() == b"bgColor";
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"rgb" {
                        let rgb = parse_argb(&String::from_utf8_lossy(&attr.value));
                        if is_bg {
                            bg = rgb;
                        } else {
                            fg = rgb;
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("styles.xml parse error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(fills)
}

/// Parse `AARRGGBB` or `RRGGBB` into 0xRRGGBB.
fn parse_argb(s: &str) -> Option<u32> {
    let hex = match s.len() {
        8 => &s[2..],
        6 => s,
        _ => return None,
    };
    u32::from_str_radix(hex, 16).ok()
}

/// Unescape the 5 predefined XML entities: &amp; &lt; &gt; &quot; &apos;
pub(crate) fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
