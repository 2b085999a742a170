pub use anyhow::{bail, ensure, format_err, Context, Error, Result};
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::Borrow,
    fmt::{self, Display, Formatter},
    ops::{Deref, DerefMut},
};
pub use tch::{
    nn::{self, Module as _, ModuleT as _, OptimizerConfig as _},
    Device, Kind, Reduction, Tensor,
};
