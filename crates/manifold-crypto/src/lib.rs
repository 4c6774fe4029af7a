pub mod content_address;
pub mod manifest_tree;

pub use content_address::{
    code_hash, create2_address, init_code, AddressError, ContentAddresser, Prediction,
    INIT_CODE_PREFIX_LEN, MAX_CODE_SIZE,
};

pub use manifest_tree::{
    hash_pair, leaf_hash, verify, ManifestRoot, RouteManifestTree, RouteProof, TreeError,
    TreeResult, MAX_PROOF_DEPTH,
};
