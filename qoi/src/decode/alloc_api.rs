use crate::{
    decode::{checked_pixel_count, DecodeError, QoiDecodeContext},
    Header, Rgba,
};
use alloc::vec::Vec;

impl QoiDecodeContext {
    /// Decodes a QOI image, appending the pixels to `w`.
    ///
    /// Returns the parsed header, if successful. On failure `w` is restored
    /// to its original length; no partially decoded pixels are exposed.
    pub fn decode_to_vec(data: &[u8], w: &mut Vec<Rgba>) -> Result<Header, DecodeError> {
        let mut state = QoiDecodeContext::new();
        state.decode_to_vec_with_state(data, w)
    }

    /// Decodes a QOI image, appending the pixels to `w`, with the given
    /// state as starting state.
    pub fn decode_to_vec_with_state(
        &mut self,
        data: &[u8],
        w: &mut Vec<Rgba>,
    ) -> Result<Header, DecodeError> {
        let header = Header::parse(data)?;
        let pixel_count = checked_pixel_count(&header)?;

        let start = w.len();
        w.resize(start + pixel_count, Rgba::ZERO);

        match self.decode_to_slice_with_state(data, &mut w[start..]) {
            Ok(header) => Ok(header),
            Err(e) => {
                w.truncate(start);
                Err(e)
            }
        }
    }
}
