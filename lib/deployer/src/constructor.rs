use alloy::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt},
    json_abi::JsonAbi,
    primitives::Bytes,
};

use crate::{
    artifact::Artifact,
    error::{Error, Result},
};

/// Constructor call data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constructor {
    /// Constructor signature, e.g. `constructor(string,string)`.
    pub signature: String,
    /// ABI encoded arguments.
    pub encoded_args: Bytes,
}

impl Constructor {
    /// Encodes `args` against the constructor of `abi`.
    ///
    /// Each argument is given as text and coerced to the declared Solidity
    /// type (`"42"` for `uint256`, `"0x..."` for `address`, `"[1,2]"` for
    /// arrays, ...).
    ///
    /// # Errors
    ///
    /// [`Error::ConstructorArgs`] if the count differs from the declared
    /// inputs or an argument does not fit its type.
    pub fn encode(abi: &JsonAbi, args: &[String]) -> Result<Self> {
        let Some(constructor) = &abi.constructor else {
            if !args.is_empty() {
                return Err(Error::ConstructorArgs(format!(
                    "contract has no constructor, but {} argument(s) given",
                    args.len()
                )));
            }
            return Ok(Self {
                signature: "constructor()".to_owned(),
                encoded_args: Bytes::new(),
            });
        };

        let types = constructor
            .inputs
            .iter()
            .map(|param| {
                let ty = param.selector_type();
                DynSolType::parse(&ty).map_err(|e| {
                    Error::ConstructorArgs(format!(
                        "unsupported parameter type `{ty}`: {e}"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let signature = format!(
            "constructor({})",
            types
                .iter()
                .map(DynSolType::sol_type_name)
                .collect::<Vec<_>>()
                .join(",")
        );

        if types.len() != args.len() {
            return Err(Error::ConstructorArgs(format!(
                "{signature} takes {} argument(s), {} given",
                types.len(),
                args.len()
            )));
        }

        let values = types
            .iter()
            .zip(&constructor.inputs)
            .zip(args)
            .map(|((ty, param), arg)| {
                ty.coerce_str(arg).map_err(|e| {
                    Error::ConstructorArgs(format!(
                        "argument `{}` of {signature}: {e}",
                        param.name
                    ))
                })
            })
            .collect::<Result<Vec<DynSolValue>>>()?;

        let encoded_args = constructor
            .abi_encode_input(&values)
            .map_err(|e| Error::ConstructorArgs(e.to_string()))?;

        Ok(Self { signature, encoded_args: encoded_args.into() })
    }

    /// Creation code: `artifact`'s bytecode followed by the arguments.
    #[must_use]
    pub fn deploy_code(&self, artifact: &Artifact) -> Bytes {
        let mut code =
            Vec::with_capacity(artifact.bytecode.len() + self.encoded_args.len());
        code.extend_from_slice(&artifact.bytecode);
        code.extend_from_slice(&self.encoded_args);
        code.into()
    }
}

#[cfg(test)]
mod tests {
    use alloy::sol_types::SolValue;

    use super::*;
    use crate::error::ErrorKind;

    fn abi(inputs: &str) -> JsonAbi {
        serde_json::from_str(&format!(
            r#"[{{ "type": "constructor", "stateMutability": "nonpayable", "inputs": {inputs} }}]"#
        ))
        .unwrap()
    }

    fn erc721_abi() -> JsonAbi {
        abi(r#"[
            { "name": "name_", "type": "string" },
            { "name": "symbol_", "type": "string" }
        ]"#)
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn encodes_name_and_symbol() {
        let ctor =
            Constructor::encode(&erc721_abi(), &args(&["My Token", "MTK"]))
                .unwrap();
        assert_eq!(ctor.signature, "constructor(string,string)");

        let expected =
            ("My Token".to_owned(), "MTK".to_owned()).abi_encode_params();
        assert_eq!(ctor.encoded_args.as_ref(), expected.as_slice());
    }

    #[test]
    fn coerces_typed_arguments() {
        let abi = abi(r#"[
            { "name": "owner", "type": "address" },
            { "name": "supply", "type": "uint256" },
            { "name": "ids", "type": "uint8[]" }
        ]"#);
        let ctor = Constructor::encode(
            &abi,
            &args(&[
                "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
                "1000",
                "[1,2,3]",
            ]),
        )
        .unwrap();
        assert_eq!(ctor.signature, "constructor(address,uint256,uint8[])");
        // head: 3 words, tail: length + 3 elements
        assert_eq!(ctor.encoded_args.len(), 32 * 7);
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = Constructor::encode(&erc721_abi(), &args(&["My Token"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("takes 2 argument(s), 1 given"));
    }

    #[test]
    fn rejects_mistyped_argument() {
        let abi = abi(r#"[{ "name": "supply", "type": "uint256" }]"#);
        let err = Constructor::encode(&abi, &args(&["lots"])).unwrap_err();
        assert!(err.to_string().contains("argument `supply`"));
    }

    #[test]
    fn no_constructor() {
        let empty = JsonAbi::default();
        let ctor = Constructor::encode(&empty, &[]).unwrap();
        assert!(ctor.encoded_args.is_empty());
        assert!(Constructor::encode(&empty, &args(&["x"])).is_err());
    }

    #[test]
    fn deploy_code_appends_arguments() {
        let artifact = Artifact::new("ERC721", erc721_abi(), "0x6080").unwrap();
        let ctor =
            Constructor::encode(&artifact.abi, &args(&["A", "B"])).unwrap();
        let code = ctor.deploy_code(&artifact);
        assert_eq!(&code[..2], &[0x60, 0x80]);
        assert_eq!(&code[2..], ctor.encoded_args.as_ref());
    }
}
