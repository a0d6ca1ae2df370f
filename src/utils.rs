//! Some utility functions

use minidom::Element;

/// Walks an XML tree and returns every element that has the given name
pub fn find_elems<S: AsRef<str>>(root: &Element, searched_name: S) -> Vec<&Element> {
    let searched_name = searched_name.as_ref();
    let mut elems: Vec<&Element> = Vec::new();

    for el in root.children() {
        if el.name() == searched_name {
            elems.push(el);
        } else {
            let ret = find_elems(el, searched_name);
            elems.extend(ret);
        }
    }
    elems
}

/// Walks an XML tree until it finds an elements with the given name
pub fn find_elem<S: AsRef<str>>(root: &Element, searched_name: S) -> Option<&Element> {
    let searched_name = searched_name.as_ref();
    if root.name() == searched_name {
        return Some(root);
    }

    for el in root.children() {
        if el.name() == searched_name {
            return Some(el);
        } else {
            let ret = find_elem(el, searched_name);
            if ret.is_some() {
                return ret;
            }
        }
    }
    None
}


#[cfg(test)]
mod tests {
    use super::*;

    const MULTISTATUS: &str = r#"<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
        <d:response><d:href>/cal/a.ics</d:href></d:response>
        <d:response><d:href>/cal/b.ics</d:href><d:propstat><d:prop><d:getetag>"42"</d:getetag></d:prop></d:propstat></d:response>
    </d:multistatus>"#;

    #[test]
    fn elements_are_found_at_any_depth() {
        let root: Element = MULTISTATUS.parse().unwrap();
        let responses = find_elems(&root, "response");
        assert_eq!(responses.len(), 2);
        assert_eq!(find_elem(responses[1], "getetag").map(|e| e.text()), Some("\"42\"".to_string()));
        assert!(find_elem(responses[0], "getetag").is_none());
    }
}
