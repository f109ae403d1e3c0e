// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed accessors over `plist::Dictionary`/`plist::Value`.
//!
//! `plist::Value` already is the tagged variant this engine needs (string,
//! data, bool, array, nested dictionary, ...); there is no value in wrapping
//! it a second time. What's missing from the crate itself is a convenient,
//! never-fatal way to ask "is there a string/array/bool at this key", and a
//! dotted-path lookup for the nested `CFBundleIcons.CFBundlePrimaryIcon...`
//! keys. Both are supplied here as an extension trait.

use plist::{Dictionary, Value};

pub trait DictionaryExt {
    fn get_string(&self, key: &str) -> Option<&str>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_string_array(&self, key: &str) -> Option<Vec<String>>;
    fn get_dict(&self, key: &str) -> Option<&Dictionary>;

    /// Look up a value by a dot-separated path of dictionary keys, e.g.
    /// `"CFBundleIcons.CFBundlePrimaryIcon.CFBundleIconFiles"`.
    fn get_path_string_array(&self, path: &str) -> Option<Vec<String>>;
}

impl DictionaryExt for Dictionary {
    fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_string()
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_boolean()
    }

    fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        self.get(key)?
            .as_array()?
            .iter()
            .map(Value::as_string)
            .collect::<Option<Vec<_>>>()
            .map(|v| v.into_iter().map(str::to_string).collect())
    }

    fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key)?.as_dictionary()
    }

    fn get_path_string_array(&self, path: &str) -> Option<Vec<String>> {
        let mut segments = path.split('.');
        let last = segments.next_back()?;

        let mut dict = self;
        for segment in segments {
            dict = dict.get_dict(segment)?;
        }

        dict.get_string_array(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict_from_xml(xml: &str) -> Dictionary {
        plist::Value::from_reader_xml(std::io::Cursor::new(xml.as_bytes()))
            .unwrap()
            .into_dictionary()
            .unwrap()
    }

    #[test]
    fn nested_path_lookup() {
        let dict = dict_from_xml(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>CFBundleIcons</key>
  <dict>
    <key>CFBundlePrimaryIcon</key>
    <dict>
      <key>CFBundleIconFiles</key>
      <array>
        <string>AppIcon60x60</string>
      </array>
    </dict>
  </dict>
</dict>
</plist>"#,
        );

        assert_eq!(
            dict.get_path_string_array("CFBundleIcons.CFBundlePrimaryIcon.CFBundleIconFiles"),
            Some(vec!["AppIcon60x60".to_string()])
        );
        assert_eq!(dict.get_path_string_array("CFBundleIcons.Missing.Key"), None);
    }
}
