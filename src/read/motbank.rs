use super::Reader;
use crate::format::*;
use crate::*;

impl BankContainer {
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let r = Reader::new(buf);
        r.check_tag("motbank header", MOTBANK_MAGIC, MOTBANK_VERSION)?;
        let header: MotbankHeader = r.record("motbank header", 0)?;
        let records: Vec<MotbankRecord> = r.records(
            "motbank entry table",
            header.entry_table_offset as usize,
            header.entry_count as usize,
        )?;
        let entries = records
            .into_iter()
            .map(|rec| {
                Ok(BankEntry {
                    motlist_path: r.wide_string("motlist path", rec.path_offset as usize)?,
                    bank_id: rec.bank_id,
                    weapon_id: rec.weapon_id,
                    layer_mask: rec.layer_mask,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BankContainer { entries })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roundtrip() {
        let bank = BankContainer {
            entries: vec![
                BankEntry {
                    motlist_path: "CAF/dodge.motlist".into(),
                    bank_id: 900,
                    ..Default::default()
                },
                BankEntry {
                    motlist_path: "CAF/sword.motlist".into(),
                    bank_id: 901,
                    weapon_id: 12,
                    layer_mask: 0b101,
                },
            ],
        };
        assert_eq!(BankContainer::decode(&bank.encode().unwrap()).unwrap(), bank);
    }

    #[test]
    fn motlist_is_not_a_motbank() {
        let buf = AnimationContainer::new("x", vec![AnimationClip::new("a", 1, 30)])
            .encode()
            .unwrap();
        match BankContainer::decode(&buf) {
            Err(Error::Format { expected, .. }) => assert!(expected.contains("mbnk")),
            other => panic!("{:?}", other),
        }
    }
}
