use quick_xml::events::Event;
use quick_xml::Reader;

/// Extract the text of the first `<id>` element sitting directly under a
/// `<review>` element, anywhere in the document.
///
/// Returns `Ok(None)` for well-formed documents without such an element;
/// only malformed XML is an error.
pub fn first_review_id(body: &str) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut buf = Vec::new();
    // open-element stack, so `id` can check its parent
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut capture = false;
    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(ref e) => {
                capture = e.name() == b"id"
                    && path.last().map(Vec::as_slice) == Some(&b"review"[..]);
                path.push(e.name().to_vec());
            }
            Event::End(_) => {
                path.pop();
                capture = false;
            }
            Event::Text(ref e) if capture => {
                return Ok(Some(e.unescape_and_decode(&reader)?));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

#[test]
fn test_first_review_id_found() {
    let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<GoodreadsResponse>
  <Request><authentication>true</authentication></Request>
  <review>
    <id>348104812</id>
    <rating>4</rating>
  </review>
</GoodreadsResponse>"#;
    assert_eq!(
        first_review_id(body).unwrap(),
        Some("348104812".to_string())
    );
}

#[test]
fn test_first_review_id_takes_the_first_match() {
    let body = "<r><review><id>1</id></review><review><id>2</id></review></r>";
    assert_eq!(first_review_id(body).unwrap(), Some("1".to_string()));
}

#[test]
fn test_first_review_id_requires_review_parent() {
    // an <id> elsewhere in the tree does not count
    let body = "<r><book><id>99</id></book><review><work><id>7</id></work></review></r>";
    assert_eq!(first_review_id(body).unwrap(), None);
}

#[test]
fn test_first_review_id_absent() {
    assert_eq!(first_review_id("<GoodreadsResponse/>").unwrap(), None);
    assert_eq!(
        first_review_id("<r><review><rating>3</rating></review></r>").unwrap(),
        None
    );
}

#[test]
fn test_first_review_id_malformed() {
    assert!(first_review_id("<review><id>5</review>").is_err());
}
