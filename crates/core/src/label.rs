//! Closed vocabularies with a stable upper-case wire label.

/// Declare a fieldless enum whose variants map one-to-one to string labels.
///
/// Generates `Serialize`/`Deserialize` using the labels, `as_str()`, `ALL`,
/// `Display`, and a case-insensitive `FromStr` that fails with
/// [`DomainError::Validation`](crate::DomainError::Validation).
#[macro_export]
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $name {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($label) {
                        return Ok($name::$variant);
                    }
                )+
                Err($crate::DomainError::validation(format!(
                    "unknown {} '{}'",
                    stringify!($name),
                    s
                )))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::DomainError;

    crate::labelled_enum! {
        enum Channel {
            Web => "WEB",
            CallCenter => "CALL_CENTER",
        }
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" call_center ".parse::<Channel>().unwrap(), Channel::CallCenter);
        assert_eq!(Channel::Web.to_string(), "WEB");
        assert_eq!(Channel::ALL.len(), 2);
    }

    #[test]
    fn unknown_label_is_a_validation_error() {
        match "fax".parse::<Channel>() {
            Err(DomainError::Validation(msg)) if msg.contains("Channel") => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
