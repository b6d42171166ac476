//! Record storage in an NVS namespace
//!
//! NVS keys are limited to 15 characters, so a record path maps to its file
//! stem: "/wifi_config.json" is kept under the key "wifi_config".

use anyhow::anyhow;
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};

use picofcm_mcu::Storage;

const NVS_NAMESPACE: &str = "picofcm";

pub struct NvsStorage {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStorage {
    pub fn new(partition: EspNvsPartition<NvsDefault>) -> anyhow::Result<Self> {
        Ok(Self {
            nvs: EspNvs::new(partition, NVS_NAMESPACE, true)?,
        })
    }
}

fn key(path: &str) -> &str {
    let name = path.trim_start_matches('/');
    name.strip_suffix(".json").unwrap_or(name)
}

impl Storage for NvsStorage {
    type Error = anyhow::Error;

    fn exists(&self, path: &str) -> bool {
        self.nvs.contains(key(path)).unwrap_or(false)
    }

    fn read(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let key = key(path);
        let len = self
            .nvs
            .blob_len(key)?
            .ok_or_else(|| anyhow!("{key} not found"))?;
        let mut buf = vec![0u8; len];
        let data = self
            .nvs
            .get_blob(key, &mut buf)?
            .ok_or_else(|| anyhow!("{key} not found"))?;
        Ok(data.to_vec())
    }

    fn write(&mut self, path: &str, data: &[u8]) -> anyhow::Result<()> {
        self.nvs.set_blob(key(path), data)?;
        Ok(())
    }

    fn remove(&mut self, path: &str) -> anyhow::Result<()> {
        self.nvs.remove(key(path))?;
        Ok(())
    }
}
